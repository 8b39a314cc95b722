/// Filename sanitization for attacker-supplied names.
///
/// Every name read from a header passes through [`sanitize`] before it is used
/// to create a file. It is the only thing keeping a peer from writing outside
/// the receive directory.

use crate::protocol::truncate_name;

/// Reduce `raw` to its final path component.
///
/// Everything up to the first NUL is kept, then everything after the last `/`
/// or `\`, bounded to `MAX_NAME_LEN` bytes.
pub fn sanitize(raw: &str) -> String {
    let terminated = raw.split('\0').next().unwrap_or("");
    let base = terminated
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(terminated);
    truncate_name(base).to_string()
}

/// Whether a sanitized name can name a regular file in the receive directory.
pub fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
