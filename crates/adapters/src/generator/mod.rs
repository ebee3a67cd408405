//! Generative-AI draft gateway adapters

pub mod http;
pub mod stub;

pub use http::HttpDraftGenerator;
pub use stub::StubDraftGenerator;

use devshare_domain::Platform;

/// Default prompt template; `%%platform%%` and `%%content%%` are substituted
/// per request
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Write a social media post for %%platform%% based on \
                                           these learning notes. Keep the platform's tone and \
                                           length conventions. Notes:\n\n%%content%%";

/// Build the gateway prompt by substituting the template placeholders
pub fn build_prompt(template: &str, content: &str, platform: Platform) -> String {
    template
        .replace("%%platform%%", &platform.to_string())
        .replace("%%content%%", content)
}
