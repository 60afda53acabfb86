//! Question-answering prompt template.

/// Retrieval query used for summaries.
pub const SUMMARY_RETRIEVAL_QUERY: &str = "Summarize the document.";
/// Question placed in the prompt for summaries.
pub const SUMMARY_QUESTION: &str = "Summarize the document in detail";

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Values substituted into the template.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    /// Retrieved chunks, most relevant first.
    pub context: &'a [String],
    /// User question or [`SUMMARY_QUESTION`].
    pub question: &'a str,
}

/// Render the prompt: answer only from context, in detail, and summarize everything when asked
/// for a summary.
pub fn render_prompt(input: &PromptInput<'_>) -> String {
    let context = input.context.join(CONTEXT_SEPARATOR);
    format!(
        "Answer the question as detailed as possible from the provided context, make sure to \
provide all the details. Use only the provided context; if the answer is not in the context, \
say that it is not available in the provided documents. If the user asks for a summary, then \
summarize all the contents of the provided context and give the summary of the content.\n\n\
Context:\n{context}\n\n\
Question:\n{question}\n\n\
Answer:\n",
        question = input.question.trim(),
    )
}
