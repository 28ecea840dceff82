use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DecodeError, kind_of};

pub type MailId = String;

/// One entry of the mail list, as served by the search endpoint with `output=mail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailRecord {
    pub id: MailId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<FileItem>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,
}

impl MailRecord {
    /// HTML body if the server sent a non-blank one.
    pub fn html(&self) -> Option<&str> {
        non_blank(self.html.as_deref())
    }

    pub fn date(&self) -> Option<&str> {
        non_blank(self.date.as_deref())
    }

    pub fn photo(&self) -> Option<&str> {
        non_blank(self.photo.as_deref())
    }

    /// Initials of the sender, used where no avatar is shown.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|chunk| chunk.chars().next())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileItem {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url_noncustom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_datetime_usertime: Option<String>,
}

impl FileItem {
    /// Custom thumbnail first, then the stock one.
    pub fn thumbnail(&self) -> Option<&str> {
        non_blank(self.thumbnail_url.as_deref())
            .or_else(|| non_blank(self.thumbnail_url_noncustom.as_deref()))
    }
}

/// Submission label. Spaces on the wire, underscores in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub String);

impl Label {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human form, e.g. `ai generated`.
    pub fn display(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.display())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Label(raw.replace(' ', "_")))
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

/// Decode the search endpoint's body into mail records.
pub fn decode_mail_list(body: &[u8]) -> Result<Vec<MailRecord>, DecodeError> {
    let v: serde_json::Value = serde_json::from_slice(body)?;
    match v {
        // The backend marshals an empty result as `null`.
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Array(_) => Ok(serde_json::from_value(v)?),
        other => Err(DecodeError::Shape {
            expected: "an array of mail records",
            found: kind_of(&other),
        }),
    }
}
