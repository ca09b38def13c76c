/// CPF (Brazilian individual taxpayer number) utilities
///
/// A CPF has 11 digits; the last two are mod-11 check digits over the
/// preceding ones. Sequences of a single repeated digit (`111.111.111-11`)
/// pass the checksum but are not issued, so they are rejected too.
///
/// # Example
///
/// ```
/// use socios_shared::cpf::{clean_cpf, format_cpf, validate_cpf};
///
/// assert!(validate_cpf("529.982.247-25"));
/// assert_eq!(clean_cpf("529.982.247-25"), "52998224725");
/// assert_eq!(format_cpf("52998224725"), "529.982.247-25");
/// ```

/// Number of digits in a CPF
pub const CPF_LENGTH: usize = 11;

/// Strips everything but ASCII digits
pub fn clean_cpf(cpf: &str) -> String {
    cpf.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();

    match 11 - (sum % 11) {
        10 | 11 => 0,
        digit => digit,
    }
}

/// Checks length, repeated digits and both check digits
///
/// Punctuation is ignored, so formatted and bare input both work.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = clean_cpf(cpf)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != CPF_LENGTH {
        return false;
    }

    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Formats as `000.000.000-00`
///
/// Input that does not clean to exactly 11 digits is returned unchanged.
pub fn format_cpf(cpf: &str) -> String {
    let digits = clean_cpf(cpf);
    if digits.len() != CPF_LENGTH {
        return cpf.to_string();
    }

    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}
