//! Version header generation

use crate::config::HeaderConfig;

use super::VersionRecord;

/// Render the version header for `version`
///
/// The output depends only on its inputs, so regenerating without a version
/// change produces identical bytes.
pub fn render_header(version: &VersionRecord, config: &HeaderConfig) -> String {
    let guard = &config.guard;
    let prefix = &config.macro_prefix;

    format!(
        "#ifndef {guard}\n\
         #define {guard}\n\
         \n\
         #define {prefix} \"{version}\"\n\
         #define {prefix}_MAJOR {major}\n\
         #define {prefix}_MINOR {minor}\n\
         #define {prefix}_PATCH {patch}\n\
         \n\
         #endif // {guard}\n",
        major = version.major,
        minor = version.minor,
        patch = version.patch,
    )
}
