use rust_decimal::Decimal;

use crate::rules::VariableRange;

/// Questions the rules need answered by whoever drives the character sheet.
pub trait UserPrompt {
    /// Pick a value for a `Variable(min-max)` rule; `None` keeps the minimum.
    fn select_number(&self, label: &str, range: VariableRange) -> Option<Decimal>;

    /// Confirm deleting an entity from the character.
    fn confirm_delete(&self, name: &str) -> bool;
}

/// Non-interactive answers: the minimum for every variable value, yes to every deletion.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoPrompt;

impl UserPrompt for AutoPrompt {
    fn select_number(&self, _label: &str, range: VariableRange) -> Option<Decimal> {
        Some(range.min)
    }

    fn confirm_delete(&self, _name: &str) -> bool {
        true
    }
}

// Resolve a raw cost field: `Variable(...)` becomes the chosen, clamped number.
pub(crate) fn resolve_variable(prompt: &dyn UserPrompt, label: &str, raw: &str) -> String {
    match VariableRange::parse(raw) {
        Some(range) => {
            let chosen = prompt
                .select_number(label, range)
                .map(|value| range.clamp(value))
                .unwrap_or(range.min);
            log::debug!("Variable value for {label} set to {chosen}");
            chosen.normalize().to_string()
        }
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Decimal);

    impl UserPrompt for Fixed {
        fn select_number(&self, _label: &str, _range: VariableRange) -> Option<Decimal> {
            Some(self.0)
        }

        fn confirm_delete(&self, _name: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_variable_values_are_resolved_and_clamped() {
        assert_eq!(resolve_variable(&AutoPrompt, "Gym", "Variable(100-1000)"), "100");
        assert_eq!(resolve_variable(&Fixed(Decimal::from(450)), "Gym", "Variable(100-1000)"), "450");
        assert_eq!(resolve_variable(&Fixed(Decimal::from(5000)), "Gym", "Variable(100-1000)"), "1000");
        assert_eq!(resolve_variable(&AutoPrompt, "Gym", "Rating * 100"), "Rating * 100");
    }
}
