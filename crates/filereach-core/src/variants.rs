//! Brace-group expansion for rule globs.
//!
//! A rule such as `/usr/{bin,sbin}/foo{,.real}` stands for several concrete
//! globs. [`explode_variants`] enumerates them lazily and in a stable order so
//! that cache keys and generated output are reproducible between runs.
//!
//! Only the flat form `<prefix>{a,b,...}<suffix>` is understood. Escaped
//! braces and braces nested inside a single option are not.

/// Expand every brace group in `glob` into the cross-product of concrete globs.
///
/// Options of the leftmost group vary slowest:
///
/// ```
/// use filereach_core::explode_variants;
///
/// let v: Vec<_> = explode_variants("/a/{b,c}/{d,e}").collect();
/// assert_eq!(v, ["/a/b/d", "/a/b/e", "/a/c/d", "/a/c/e"]);
/// ```
///
/// A glob without `{` yields itself. An opening brace with no closing brace
/// after it is treated as literal text.
pub fn explode_variants<'a>(glob: &'a str) -> Box<dyn Iterator<Item = String> + 'a> {
    let Some((prefix, options, suffix)) = split_brace_group(glob) else {
        return Box::new(std::iter::once(glob.to_string()));
    };

    Box::new(options.split(',').flat_map(move |opt| {
        explode_variants(suffix).map(move |rest| format!("{prefix}{opt}{rest}"))
    }))
}

/// Split off the first brace group as `(prefix, options, suffix)`.
fn split_brace_group(glob: &str) -> Option<(&str, &str, &str)> {
    let open = glob.find('{')?;
    let close = open + glob[open..].find('}')?;
    Some((&glob[..open], &glob[open + 1..close], &glob[close + 1..]))
}
