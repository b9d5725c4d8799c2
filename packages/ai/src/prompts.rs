// ABOUTME: Prompts for documentation section generation
// ABOUTME: System prompt is parameterised by the document title; user prompt by the section

use crate::generation::SectionGenerationRequest;

/// System prompt framing the model as a technical writer for this document
pub fn system_prompt(document_title: &str) -> String {
    format!(
        "You are a technical writer creating the document \"{}\".\n\
         Write clear, professional documentation that is:\n\
         - Well-structured with proper markdown formatting\n\
         - Technically accurate based on the context provided\n\
         - Concise but comprehensive\n\
         - Includes examples where relevant",
        document_title
    )
}

/// User prompt for a single section
pub fn section_prompt(request: &SectionGenerationRequest) -> String {
    let mut prompt = format!(
        "Write the \"{}\" section for this documentation.\n",
        request.section_title
    );

    if !request.section_description.trim().is_empty() {
        prompt.push_str(&format!(
            "\nSection purpose: {}\n",
            request.section_description.trim()
        ));
    }

    match request.context.as_deref().map(str::trim) {
        Some(context) if !context.is_empty() => {
            prompt.push_str(&format!("\nAdditional context:\n{}\n", context));
        }
        _ => {
            prompt.push_str("\nNo additional context was provided. Write from the section purpose alone.\n");
        }
    }

    prompt.push_str(
        "\nReturn only the markdown content of the section, starting with a level-2 heading.",
    );
    prompt
}
