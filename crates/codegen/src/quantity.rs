//! Canonical quantity grammar check.
//!
//! Quantities travel as strings and must re-derive through their canonical
//! parse when the generated code is built, so the transcoder verifies the
//! grammar up front and propagates a hard error instead of emitting source
//! that cannot construct.

/// Accepts `[+-]digits[.digits][suffix]` where suffix is a binary (Ki..Ei)
/// or decimal (n,u,m,k,M,G,T,P,E) multiplier, or a scientific exponent.
pub fn is_valid(s: &str) -> bool {
    let rest = s.strip_prefix(['+', '-']).unwrap_or(s);
    if rest.is_empty() {
        return false;
    }
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    let (num, suffix) = rest.split_at(digits_end);
    if num.is_empty() || num.matches('.').count() > 1 || !num.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    match suffix {
        "" | "n" | "u" | "m" | "k" | "M" | "G" | "T" | "P" | "E" => true,
        "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" => true,
        _ => {
            // Scientific notation: e/E followed by an optionally signed integer.
            let exp = match suffix.strip_prefix(['e', 'E']) {
                Some(e) => e,
                None => return false,
            };
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid;

    #[test]
    fn accepts_the_usual_forms() {
        for q in ["500m", "1", "0.5", "1.5Gi", "100Ki", "2e3", "1E-2", "+2", "-1", "128974848"] {
            assert!(is_valid(q), "{q} should parse");
        }
    }

    #[test]
    fn rejects_garbage() {
        for q in ["", "Gi", "1.2.3", "4X", "1e", "1e+", "..", "-", "500 m", "1gib"] {
            assert!(!is_valid(q), "{q} should not parse");
        }
    }
}
