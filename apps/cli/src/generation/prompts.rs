// All prompt templates for resume generation.

/// Per-month section prompt. Replace `{commits}` before sending.
pub const SECTION_PROMPT_TEMPLATE: &str = r#"Summarize the commit history below into 3-5 resume bullet points.

Rules:
- Start immediately with "-", no preamble or explanation
- Include the [repository name] in every bullet
- Mention the technology stack involved
- Write in English

Example:
- [exif-frame] Improved EXIF metadata handling for photo frames (JavaScript, Canvas API)

{commits}

Output:"#;

/// Final assembly prompt. Replace `{sections}` before sending.
pub const FINAL_PROMPT_TEMPLATE: &str = r###"Write a resume based on the monthly development activity below.

Format:
# Technical Skills
(technologies used, grouped by category)

# Project Experience
(treat each [repository name] as a project, group under "## <repository name>", focus on outcomes)

Rules:
- Do NOT use code blocks (```)
- Start directly with "# Technical Skills"
- Write in English

{sections}"###;
