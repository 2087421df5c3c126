//! Address list extraction.
//!
//! Pulls bare addresses out of `From`/`To`/`Cc`-style headers without a full
//! RFC 5322 address grammar: anything inside `<...>` is an address, and a
//! header where no bracket was closed is treated as a comma-separated list.

use mailwright_mime::decode_header;

/// Scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between addresses, waiting for `<`.
    Outside,
    /// Accumulating an address until `>`.
    Inside,
}

/// Extracts the addresses from a raw header value.
///
/// Encoded words are decoded first. Display names are discarded. A nested
/// `<` restarts the current address, so only the innermost bracket wins.
/// When no bracket was closed the header is read as a comma-separated list.
///
/// # Errors
///
/// Returns an error if the header cannot be decoded.
pub fn extract_addresses(raw: impl AsRef<[u8]>) -> mailwright_mime::Result<Vec<String>> {
    let raw = raw.as_ref();
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let header = decode_header(raw)?;

    let mut addrs = Vec::new();
    let mut current = String::new();
    let mut closed = false;
    let mut state = State::Outside;

    for c in header.chars() {
        match (state, c) {
            (State::Outside, '<') => state = State::Inside,
            (State::Outside, _) => {}
            (State::Inside, '<') => current.clear(),
            (State::Inside, '>') => {
                let addr = current.trim();
                if !addr.is_empty() {
                    addrs.push(addr.to_string());
                }
                current.clear();
                closed = true;
                state = State::Outside;
            }
            (State::Inside, _) => current.push(c),
        }
    }

    // `<>` closes a bracket without an address and must not fall back.
    if closed {
        return Ok(addrs);
    }

    Ok(header
        .replace(' ', "")
        .split(',')
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect())
}
