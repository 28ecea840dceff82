use image::DynamicImage;

use crate::domain::mail::MailRecord;

/// Images worth showing for a mail: attachment thumbnails, then the sender photo.
pub fn carousel_urls(mail: &MailRecord) -> Vec<String> {
    let mut urls: Vec<String> = mail
        .files
        .iter()
        .filter_map(|f| f.thumbnail())
        .map(str::to_string)
        .collect();
    if urls.is_empty()
        && let Some(photo) = mail.photo()
    {
        urls.push(photo.to_string());
    }
    urls
}

/// Decode bytes returned by the image proxy.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, String> {
    if bytes.is_empty() {
        return Err("empty image".into());
    }
    image::load_from_memory(bytes).map_err(|e| e.to_string())
}
