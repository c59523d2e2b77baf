// Resume generation: one section per year-month bucket, then one final
// assembly call. All calls go through `dyn TextGenerator`.

pub mod prompts;
pub mod sections;
