use std::mem;

use log::{debug, warn};

use crate::domain::inference::{InferenceRequest, InferenceResult, LlmRequest};

/// Progress markers, in the order a successful run emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Step {
    PrefillSubmitted = 0,
    PrefillSucceeded = 1,
    LlmSubmitted = 2,
    LlmSucceeded = 3,
    Done = 4,
    /// Sentinel; ends the run.
    Error = -1,
}

/// Loader labels for steps 0..=4.
pub const STEP_LABELS: [&str; 5] = [
    "Logging in",
    "Getting description",
    "Querying LLM",
    "Inferencing...",
    "Done",
];

/// Same as [`STEP_LABELS`] with the last slot used for the error sentinel.
pub const ERROR_LABELS: [&str; 5] = [
    "Logging in",
    "Getting description",
    "Querying LLM",
    "Inferencing...",
    "Error",
];

impl Step {
    /// Numeric marker; `-1` for the error sentinel.
    pub fn marker(self) -> i8 {
        self as i8
    }

    /// Slot of the loader to highlight. The error sentinel uses the last one.
    pub fn slot(self) -> usize {
        match self {
            Step::Error => STEP_LABELS.len() - 1,
            s => s as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Prefilling,
    Prefilled(LlmRequest),
    Inferring,
    Done(InferenceResult),
    Error(String),
}

impl PipelineState {
    /// A request is outstanding or about to be sent.
    pub fn in_flight(&self) -> bool {
        matches!(
            self,
            PipelineState::Prefilling | PipelineState::Prefilled(_) | PipelineState::Inferring
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// User asked to run the pipeline on a mail body.
    Start { description: String },
    PrefillFinished(Result<LlmRequest, String>),
    /// Move from `Prefilled` to the inference request.
    Chain,
    InferenceFinished(Result<InferenceResult, String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Step(Step),
    Prefill { description: String },
    /// Feed [`Event::Chain`] back in.
    Chain,
    Infer(InferenceRequest),
    /// Final payload for the result viewer.
    Show(String),
    Fail(String),
}

/// One transition. Pure: no I/O, no logging of its own beyond ignored events.
pub fn transition(state: PipelineState, event: Event) -> (PipelineState, Vec<Effect>) {
    use PipelineState as S;

    match (state, event) {
        (s @ (S::Idle | S::Done(_) | S::Error(_)), Event::Start { description }) => {
            if description.trim().is_empty() {
                return (s, Vec::new());
            }
            (
                S::Prefilling,
                vec![
                    Effect::Step(Step::PrefillSubmitted),
                    Effect::Prefill { description },
                ],
            )
        }

        (S::Prefilling, Event::PrefillFinished(Ok(request))) => (
            S::Prefilled(request),
            vec![Effect::Step(Step::PrefillSucceeded), Effect::Chain],
        ),

        (S::Prefilled(request), Event::Chain) => (
            S::Inferring,
            vec![
                Effect::Step(Step::LlmSubmitted),
                Effect::Infer(InferenceRequest::wrap(request)),
            ],
        ),

        (S::Inferring, Event::InferenceFinished(Ok(result))) => {
            let shown = result.pretty();
            (
                S::Done(result),
                vec![
                    Effect::Step(Step::LlmSucceeded),
                    Effect::Step(Step::Done),
                    Effect::Show(shown),
                ],
            )
        }

        (S::Prefilling, Event::PrefillFinished(Err(message)))
        | (S::Inferring, Event::InferenceFinished(Err(message))) => (
            S::Error(message.clone()),
            vec![Effect::Step(Step::Error), Effect::Fail(message)],
        ),

        (s, event) => {
            debug!("ignoring {event:?} in state {s:?}");
            (s, Vec::new())
        }
    }
}

/// Pipeline state for one view, plus the markers of the current run.
#[derive(Debug, Default)]
pub struct Pipeline {
    state: PipelineState,
    run: u64,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Generation of the current run; events must carry it back.
    pub fn run(&self) -> u64 {
        self.run
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<Step> {
        self.steps.last().copied()
    }

    /// Begin a run. Ignored while a run is in flight or when the
    /// description is blank.
    pub fn start(&mut self, description: &str) -> Vec<Effect> {
        if self.state.in_flight() {
            warn!("pipeline already running (run {}), ignoring start", self.run);
            return Vec::new();
        }
        self.apply(Event::Start {
            description: description.to_string(),
        })
    }

    /// Feed the outcome of an effect. Events from an older run are dropped.
    pub fn handle(&mut self, run: u64, event: Event) -> Vec<Effect> {
        if run != self.run {
            debug!("dropping event from run {run}, current run is {}", self.run);
            return Vec::new();
        }
        if matches!(event, Event::Start { .. }) {
            return Vec::new();
        }
        self.apply(event)
    }

    /// Back to `Idle` once the result or error has been dismissed.
    pub fn reset(&mut self) {
        if self.state.in_flight() {
            return;
        }
        self.state = PipelineState::Idle;
        self.steps.clear();
    }

    fn apply(&mut self, event: Event) -> Vec<Effect> {
        let state = mem::take(&mut self.state);
        let (next, effects) = transition(state, event);
        debug!("pipeline run {} -> {:?}", self.run, StateName(&next));
        self.state = next;

        if effects.contains(&Effect::Step(Step::PrefillSubmitted)) {
            self.run += 1;
            self.steps.clear();
        }
        self.steps.extend(effects.iter().filter_map(|e| match e {
            Effect::Step(s) => Some(*s),
            _ => None,
        }));
        effects
    }
}

/// Compact state name for logs; payloads can be large.
struct StateName<'a>(&'a PipelineState);

impl std::fmt::Debug for StateName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            PipelineState::Idle => "Idle",
            PipelineState::Prefilling => "Prefilling",
            PipelineState::Prefilled(_) => "Prefilled",
            PipelineState::Inferring => "Inferring",
            PipelineState::Done(_) => "Done",
            PipelineState::Error(_) => "Error",
        };
        f.write_str(name)
    }
}
