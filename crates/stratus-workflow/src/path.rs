//! Payload paths.
//!
//! Definition documents locate values inside the payload with dotted paths
//! such as `.stats.total`, `frames` or `.items[2].id`. A leading dot is
//! optional.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
  Key(&'a str),
  Index(usize),
}

/// Split a path into keys and array indices. Returns `None` for a malformed
/// index such as `[x]` or an unclosed bracket.
pub fn segments(path: &str) -> Option<Vec<Segment<'_>>> {
  let mut out = Vec::new();
  let mut rest = path;

  while !rest.is_empty() {
    if let Some(stripped) = rest.strip_prefix('.') {
      rest = stripped;
      continue;
    }

    if let Some(stripped) = rest.strip_prefix('[') {
      let close = stripped.find(']')?;
      let index = stripped[..close].trim().parse::<usize>().ok()?;
      out.push(Segment::Index(index));
      rest = &stripped[close + 1..];
      continue;
    }

    let end = rest.find(['.', '[']).unwrap_or(rest.len());
    out.push(Segment::Key(&rest[..end]));
    rest = &rest[end..];
  }

  Some(out)
}

/// Look up `path` inside `value`.
pub fn lookup<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
  segments(path)?
    .into_iter()
    .try_fold(value, |current, segment| match segment {
      Segment::Key(key) => current.get(key),
      Segment::Index(index) => current.get(index),
    })
}

/// Append a payload path to a JSONPath root, e.g. `under("$.payload", "frames")`
/// gives `$.payload.frames` and `under("$.payload", ".n")` gives `$.payload.n`.
pub fn under(root: &str, path: &str) -> String {
  let path = path.trim();
  if path.is_empty() {
    root.to_string()
  } else if path.starts_with('.') || path.starts_with('[') {
    format!("{}{}", root, path)
  } else {
    format!("{}.{}", root, path)
  }
}
