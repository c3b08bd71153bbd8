//! Stage instruction builders.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever instruction content
//! changes, so a record can be traced back to the prompt that produced it.

use std::collections::BTreeSet;

use crate::stage::StageRole;

/// Prompt version. Bump on any instruction content change.
pub const PROMPT_VERSION: &str = "1.2.0";

/// Seed content of the synthetic `Init` message.
pub const INIT_MESSAGE: &str = "Topic: Generating professional English sentences.";

/// Join a term set for interpolation into instructions.
fn join_terms(terms: &BTreeSet<String>) -> String {
    terms.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// System instruction for the generative stage `role`.
///
/// `Init` and `Gate` are synthesized locally and have no instruction;
/// callers should only ask for generative roles.
pub fn instruction_for(role: StageRole, terms: &BTreeSet<String>, reference_summary: &str) -> String {
    match role {
        StageRole::Draft => writer_instruction(terms, reference_summary),
        StageRole::Translate => translator_instruction(terms),
        StageRole::Evaluate => evaluator_instruction(terms),
        StageRole::Init | StageRole::Gate => String::new(),
    }
}

/// Draft stage: three coherent English sentences embedding the term,
/// grounded in the reference summary.
pub fn writer_instruction(terms: &BTreeSet<String>, reference_summary: &str) -> String {
    let term = join_terms(terms);
    format!(
        "As an AI paper writer, create three sentences about {term} that form a coherent \
paragraph, based on this reference.

[TERM]={term}

<reference>
{reference_summary}
</reference>

Instructions:
1. Directly cite content from the reference in each sentence.
2. Use an academic tone appropriate for research.
3. Include specific methodologies, results, or key concepts from the reference.
4. Be sure to include at least one sentence that contains a mathematical expression written in LaTeX syntax.
5. Highlight the research's importance or innovation.
6. Ensure the three sentences flow logically and form a cohesive paragraph.
7. Avoid starting sentences with \"The study\", \"Ultimately\", \"This study explores\", or \"In this field.\"
8. Write in English only.

Output Format:
english: Three sentences using term {term} that form a coherent paragraph."
    )
}

/// Translate stage: Korean rendition with the mandatory
/// `Korean term(English term)` parenthetical formatting.
pub fn translator_instruction(terms: &BTreeSet<String>) -> String {
    let term = join_terms(terms);
    format!(
        "You are a professor specializing in Physics, proficient in both Korean and English. \
Your task is to translate English physics content into Korean, adhering to specific guidelines.

[TERM]={term}

<translation guideline>
1. CRITICAL: All technical terms, including [TERM], MUST be translated using the format: \
Korean term(English term). Example: 적대적 훈련(adversarial training).
2. For acronyms, use the following format: Korean full term(English full term, acronym).
3. Maintain an academic tone and ensure technical accuracy in your translation.
4. Produce natural-sounding Korean translation while accurately conveying the original meaning.
5. Do not use the '*' symbol in your response.
6. Change all letters within parentheses in Korean sentences to lowercase.
7. Ensure consistency in terminology and parenthetical translation throughout the text.
8. Mathematical expressions written in LaTeX syntax must be displayed exactly as they are, \
without any modifications.
</translation guideline>

## Output Format
korean: Sentences using {term} with proper parenthetical translation.

Note: Provide only the Korean translation as output. Do not include the original English sentence."
    )
}

/// Evaluate stage: score the parenthetical formatting and report the
/// labeled fields the parser recognizes.
pub fn evaluator_instruction(terms: &BTreeSet<String>) -> String {
    let term = join_terms(terms);
    format!(
        "You are an expert evaluating English to Korean translations of Physics research papers, \
with a specific focus on proper parenthetical translations of technical terms.

<criteria>
1. The format for parenthetical translations must be: Korean term(English term).
2. The specific term {term} MUST ALWAYS be enclosed in parentheses.
3. Parentheses should be properly placed, ensuring consistency across the entire sentence.
4. The translation should convey the original meaning precisely and read naturally in Korean.
</criteria>

<instructions>
1. Evaluate the Korean translation of the provided English sentences.
2. Check the consistency and correctness of parenthesization.
3. Provide a score (0-10) based on the correctness and consistency of parenthesization.
4. Offer specific improvement suggestions if the score is less than 10.
5. Do not use the '*' symbol in your response.
6. Adhere strictly to the output format provided.
</instructions>

## Output Format
english: [English sentences using term \"{term}\"]
korean: [Korean translation sentences using parentheses]
score: [X/10]
parentheses_count: [Number of parentheses pairs in the Korean translation sentences]
suggestions: [Improvements for meaning, structure, and natural flow]"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> BTreeSet<String> {
        ["quantum entanglement".to_string()].into_iter().collect()
    }

    #[test]
    fn writer_embeds_term_and_reference() {
        let text = writer_instruction(&terms(), "A summary about entanglement.");
        assert!(text.contains("[TERM]=quantum entanglement"));
        assert!(text.contains("A summary about entanglement."));
    }

    #[test]
    fn translator_requires_parenthetical_format() {
        let text = translator_instruction(&terms());
        assert!(text.contains("Korean term(English term)"));
    }

    #[test]
    fn evaluator_lists_parser_labels() {
        let text = evaluator_instruction(&terms());
        for label in ["english:", "korean:", "score:", "parentheses_count:", "suggestions:"] {
            assert!(text.contains(label), "missing label {label}");
        }
    }

    #[test]
    fn synthetic_roles_have_no_instruction() {
        assert!(instruction_for(StageRole::Init, &terms(), "").is_empty());
        assert!(instruction_for(StageRole::Gate, &terms(), "").is_empty());
    }
}
