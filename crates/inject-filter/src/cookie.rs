use http::HeaderMap;

/// Removes every top-level `name=value` pair from a `Cookie:` header value,
/// preserving the surrounding `"; "` delimiter structure. Matching on `name`
/// is case-sensitive. Occurrences of `name=` inside another pair's value are
/// left untouched.
pub fn remove_named_cookie(name: &str, value: &str) -> String {
	let pat = format!("{name}=");
	let mut current = value.to_string();
	'outer: loop {
		let mut search_from = 0usize;
		loop {
			let Some(rel) = current[search_from..].find(pat.as_str()) else {
				break 'outer;
			};
			let idx = search_from + rel;
			if !is_pair_boundary(&current, idx) {
				search_from = idx + pat.len();
				continue;
			}
			current = erase_pair(&current, idx, &pat);
			continue 'outer;
		}
	}
	current
}

/// True if `idx` starts a pair: either the start of the string, or the
/// nearest non-space character to its left is a `;`.
fn is_pair_boundary(s: &str, idx: usize) -> bool {
	if idx == 0 {
		return true;
	}
	let trimmed = s[..idx].trim_end_matches(' ');
	trimmed.is_empty() || trimmed.ends_with(';')
}

/// Erases the pair matching `pat` at `idx`, given it is already known to be
/// at a pair boundary.
fn erase_pair(s: &str, idx: usize, pat: &str) -> String {
	let _ = pat;
	let prev_trimmed = s[..idx].trim_end_matches([' ', ';']);
	let is_first = prev_trimmed.is_empty();
	let end_prev_len = prev_trimmed.len();

	let end_idx = s[idx..].find(';').map(|i| idx + i);
	let is_last = match end_idx {
		None => true,
		Some(e) => s[e + 1..].chars().all(|c| c == ' '),
	};

	match (is_first, is_last) {
		(true, true) => String::new(),
		(false, true) => s[..end_prev_len].to_string(),
		(true, false) => {
			let e = end_idx.unwrap();
			let start_next = s[e + 1..]
				.find(|c: char| c != ' ')
				.map(|o| e + 1 + o)
				.unwrap_or(s.len());
			s[start_next..].to_string()
		}
		(false, false) => {
			let e = end_idx.unwrap();
			format!("{}{}", &s[..end_prev_len], &s[e..])
		}
	}
}

/// Looks up a named cookie's value in `headers`' `Cookie` header, if present.
/// Used for cookie-based triggers, which fire on presence alone.
pub fn get_named_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
	let value = headers.get(http::header::COOKIE)?.to_str().ok()?;
	for pair in value.split(';') {
		let pair = pair.trim();
		if let Some((pair_name, pair_value)) = pair.split_once('=') {
			if pair_name == name {
				return Some(pair_value.to_string());
			}
		}
	}
	None
}

/// Removes the named cookie from `headers`' `Cookie` value, reinserting the
/// rewritten value only if non-empty.
pub fn remove_named_cookie_from_headers(name: &str, headers: &mut HeaderMap) {
	let Some(current) = headers.get(http::header::COOKIE).and_then(|v| v.to_str().ok().map(str::to_string)) else {
		return;
	};
	let rewritten = remove_named_cookie(name, &current);
	headers.remove(http::header::COOKIE);
	if !rewritten.is_empty() {
		if let Ok(value) = http::HeaderValue::from_str(&rewritten) {
			headers.insert(http::header::COOKIE, value);
		}
	}
}

#[cfg(test)]
#[path = "cookie_tests.rs"]
mod tests;
