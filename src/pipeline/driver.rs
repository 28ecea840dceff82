use std::collections::VecDeque;

use log::{error, info};

use crate::api::DashboardApi;
use crate::pipeline::machine::{Effect, Event, Pipeline, PipelineState, Step};

pub const PREFILL_FAILED: &str = "Failed to prefill";
pub const LLM_FAILED: &str = "Failed to process with LLM";

/// Carry out one effect. Returns the event to feed back, if the effect
/// produces one. Blocks for the duration of any request.
pub fn perform(api: &dyn DashboardApi, effect: &Effect, localhost: bool) -> Option<Event> {
    match effect {
        Effect::Prefill { description } => Some(Event::PrefillFinished(
            api.prefill(description)
                .map_err(|e| e.user_message(PREFILL_FAILED)),
        )),
        Effect::Infer(request) => Some(Event::InferenceFinished(
            api.infer(request, localhost)
                .map_err(|e| e.user_message(LLM_FAILED)),
        )),
        Effect::Chain => Some(Event::Chain),
        Effect::Step(_) | Effect::Show(_) | Effect::Fail(_) => None,
    }
}

/// Run the whole pipeline on the calling thread, reporting each marker to
/// `on_step` as it is reached.
pub fn run<'p>(
    pipeline: &'p mut Pipeline,
    api: &dyn DashboardApi,
    description: &str,
    localhost: bool,
    mut on_step: impl FnMut(Step),
) -> &'p PipelineState {
    let mut queue: VecDeque<Effect> = pipeline.start(description).into();
    let run = pipeline.run();

    while let Some(effect) = queue.pop_front() {
        match &effect {
            Effect::Step(step) => on_step(*step),
            Effect::Show(_) => info!("inference run {run} finished"),
            Effect::Fail(message) => error!("inference run {run} failed: {message}"),
            _ => {}
        }
        if let Some(event) = perform(api, &effect, localhost) {
            queue.extend(pipeline.handle(run, event));
        }
    }

    pipeline.state()
}
