use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordPromptStyle {
    /// Loose request for three to five visual keywords.
    Visual,
    /// Exactly five keywords covering subject, appearance, setting, objects and mood.
    Structured,
}

impl FromStr for KeywordPromptStyle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "visual" => Ok(Self::Visual),
            "structured" => Ok(Self::Structured),
            other => Err(format!("unknown keyword prompt style: {other}")),
        }
    }
}

impl KeywordPromptStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visual => "visual",
            Self::Structured => "structured",
        }
    }
}

fn sanitize_prompt(prompt: &str) -> String {
    prompt.replace(['\n', '\r'], " ").replace('\'', "\u{2019}").trim().to_string()
}

pub fn keyword_instruction(style: KeywordPromptStyle, prompt: &str) -> String {
    let prompt = sanitize_prompt(prompt);
    match style {
        KeywordPromptStyle::Visual => format!(
            "Generate 3-5 specific, visual keywords related to '{prompt}'.\n\
             Focus on describing visual elements, colors, or scenes directly related to the prompt.\n\
             Aim for concrete, imageable concepts that would make good search terms for pictures.\n\
             Separate keywords with commas."
        ),
        KeywordPromptStyle::Structured => format!(
            "You help an artist find reference photos for the idea '{prompt}'.\n\
             Generate exactly 5 concrete, imageable keywords that a photo search engine can match.\n\
             Cover, in this order of importance:\n\
             1. the main subject\n\
             2. its physical characteristics (shape, color, texture)\n\
             3. the environment or setting\n\
             4. related objects that would appear in the same picture\n\
             5. the mood or atmosphere, expressed as something visible (lighting, weather, time of day)\n\
             Avoid abstract words, brand names and full sentences.\n\
             Reply with a single line of keywords separated by commas, with no numbering and no other text."
        ),
    }
}
