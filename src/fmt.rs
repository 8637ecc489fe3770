use std::path::Path;

use crate::amount::Amount;

/// Format an amount as dollars with thousands separators: -$1,234.56
pub fn money(val: &Amount) -> String {
    let canonical = val.to_string();
    let (negative, digits) = match canonical.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, canonical.as_str()),
    };
    let (int_part, dec_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Single-quotes `text` for a POSIX shell.
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// The `purse` invocation prefix, pinned to `ledger` when one was given.
pub fn purse_command(ledger: Option<&Path>) -> String {
    match ledger {
        Some(dir) => format!("purse --ledger {}", shell_quote(&dir.display().to_string())),
        None => "purse".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money_of(s: &str) -> String {
        money(&Amount::parse(s).unwrap())
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money_of("1234.56"), "$1,234.56");
        assert_eq!(money_of("-500"), "-$500.00");
        assert_eq!(money_of("0"), "$0.00");
        assert_eq!(money_of("1000000.99"), "$1,000,000.99");
        assert_eq!(money_of("42.1"), "$42.10");
        assert_eq!(money_of("-0.05"), "-$0.05");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("Food"), "'Food'");
        assert_eq!(shell_quote("Kid's"), r"'Kid'\''s'");
    }

    #[test]
    fn test_purse_command() {
        assert_eq!(purse_command(None), "purse");
        assert_eq!(
            purse_command(Some(Path::new("/tmp/my books"))),
            "purse --ledger '/tmp/my books'"
        );
    }
}
