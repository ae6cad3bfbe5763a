use crate::context::EvalContext;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// Invariant formatting; negatives are parenthesised so `Rating-Body` never becomes `3--2`.
pub(crate) fn format_value(value: f64) -> String {
    let text = if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    };
    if value < 0.0 { format!("({text})") } else { text }
}

/// Replace every recognised placeholder in `expression` with its current value.
///
/// Names match whole words only, longest first. `{Name}` is accepted as an
/// alternative spelling. Unrecognised words are left untouched.
pub fn substitute(expression: &str, context: &EvalContext) -> String {
    let placeholders = context.placeholders();
    let lookup = |name: &str| {
        placeholders
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| *value)
    };

    let mut output = String::with_capacity(expression.len());
    let mut rest = expression;
    let mut previous: Option<char> = None;

    while let Some(c) = rest.chars().next() {
        if c == '{' {
            if let Some(end) = rest.find('}') {
                if let Some(value) = lookup(&rest[1..end]) {
                    output.push_str(&format_value(value));
                    rest = &rest[end + 1..];
                    previous = Some('}');
                    continue;
                }
            }
        }

        if !previous.is_some_and(is_word_char) {
            let matched = placeholders.iter().find(|(name, _)| {
                rest.starts_with(name)
                    && !rest[name.len()..].chars().next().is_some_and(is_word_char)
            });
            if let Some((name, value)) = matched {
                output.push_str(&format_value(*value));
                rest = &rest[name.len()..];
                previous = name.chars().last();
                continue;
            }
        }

        output.push(c);
        rest = &rest[c.len_utf8()..];
        previous = Some(c);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle_context(rating: i32) -> EvalContext {
        EvalContext::new(rating)
            .with_value("Body", 4.0)
            .with_value("Vehicle Cost", 16000.0)
            .with_value("Armor", 6.0)
            .with_optional("Pilot", None)
            .with_value("Handling", -1.0)
    }

    #[test]
    fn test_replaces_whole_words_only() {
        let context = vehicle_context(3);
        assert_eq!(substitute("Rating*2-Body", &context), "3*2-4");
        assert_eq!(substitute("Bodyguard + Body", &context), "Bodyguard + 4");
        assert_eq!(substitute("MaxRating", &context), "0");
    }

    #[test]
    fn test_multi_word_names_and_braces() {
        let context = vehicle_context(2);
        assert_eq!(substitute("Vehicle Cost * 0.1", &context), "16000 * 0.1");
        assert_eq!(substitute("{Rating} * {Armor}", &context), "2 * 6");
        assert_eq!(substitute("{Unknown} + 1", &context), "{Unknown} + 1");
    }

    #[test]
    fn test_missing_and_negative_values() {
        let context = vehicle_context(1);
        assert_eq!(substitute("Pilot + 1", &context), "0 + 1");
        assert_eq!(substitute("Rating-Handling", &context), "1-(-1)");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(1200.0), "1200");
    }
}
