// Resume extraction pipeline.
// Plain text in, `ResumeRecord` out, through one of two interchangeable strategies:
// regex pattern extractors + assembler, or a completion-service parser.

pub mod assembler;
pub mod handlers;
pub mod llm_parser;
pub mod patterns;
pub mod prompts;
pub mod strategy;
