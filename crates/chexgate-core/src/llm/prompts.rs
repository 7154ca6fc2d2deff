//! Fixed prompts sent to the chat endpoint.

/// System instruction prepended to every conversation.
pub const SYSTEM_INSTRUCTION: &str = "You are a medical assistant specialized in lung and chest diseases. \
Your goal is to answer questions related to the symptoms, diagnosis, treatment, prevention, and complications \
of the following conditions: Atelectasis, Cardiomegaly, Effusion, Infiltration, Mass, Nodule, Pneumonia, Pneumothorax, \
Consolidation, Edema, Emphysema, Fibrosis, Pleural Thickening, Hernia. \
For any other conditions or general health questions or any other prompts, respond with: \
'I can only answer questions related to certain lung and chest conditions.' \
If the question is about symptoms or involves symptom-based queries, provide a diagnosis or possible \
explanations within the scope of the listed diseases.";

/// Prompt for the report's overall impression.
///
/// Conditions are joined in request order.
pub fn summary_prompt(conditions: &[String]) -> String {
    format!(
        "A chest X-ray analysis flagged the following conditions: {}. \
         Write a single paragraph giving an overall clinical impression of this combination of findings, \
         how they may relate to each other, and what the patient should prioritize next.",
        conditions.join(", ")
    )
}

/// Prompt for one condition's structured overview.
pub fn condition_details_prompt(condition: &str) -> String {
    format!(
        "Please provide a detailed overview of {condition}, including its description, suggested testing, \
         complications, lifestyle changes, and treatment options. \
         Format the response with clear headings and bullet points."
    )
}
