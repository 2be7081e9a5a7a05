use serde::Deserialize;

/// One request message, a single JSON object per line. Optional fields are
/// absent when the client left the matching input empty.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub meaning: Option<String>,
    #[serde(rename = "exMeaning", default)]
    pub ex_meaning: Option<String>,
    #[serde(rename = "newMeaning", default)]
    pub new_meaning: Option<String>,
}
