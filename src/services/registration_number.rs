// src/services/registration_number.rs

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

pub const MIN_NUMBER: u32 = 10_000;
pub const MAX_NUMBER: u32 = 99_999;
pub const MAX_ATTEMPTS: usize = 50;

type NumberSource = dyn Fn() -> u32 + Send + Sync;

/// Gera números de inscrição de 5 dígitos (10000-99999).
#[derive(Clone)]
pub struct RegistrationNumberGenerator {
    source: Arc<NumberSource>,
}

impl Default for RegistrationNumberGenerator {
    fn default() -> Self {
        Self::from_fn(|| rand::thread_rng().gen_range(MIN_NUMBER..=MAX_NUMBER))
    }
}

impl RegistrationNumberGenerator {
    pub fn from_fn(source: impl Fn() -> u32 + Send + Sync + 'static) -> Self {
        Self { source: Arc::new(source) }
    }

    pub fn candidate(&self) -> String {
        format_number((self.source)())
    }

    /// Candidatos aleatórios a testar contra os números já usados.
    pub fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        (0..MAX_ATTEMPTS).map(|_| self.candidate())
    }

    /// Candidatos seguidos do fallback, na ordem em que a liquidação tenta gravar.
    pub fn attempts(&self) -> impl Iterator<Item = String> + '_ {
        self.candidates().chain(std::iter::once_with(|| self.fallback()))
    }

    /// Usado quando todas as tentativas colidiram.
    pub fn fallback(&self) -> String {
        let millis = Utc::now().timestamp_millis().rem_euclid(i64::from(MAX_NUMBER - MIN_NUMBER + 1));
        format_number(MIN_NUMBER + millis as u32)
    }
}

fn format_number(n: u32) -> String {
    format!("{:05}", n.clamp(MIN_NUMBER, MAX_NUMBER))
}

pub fn is_valid_number(value: &str) -> bool {
    value.len() == 5
        && value.chars().all(|c| c.is_ascii_digit())
        && value
            .parse::<u32>()
            .map(|n| (MIN_NUMBER..=MAX_NUMBER).contains(&n))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn random_numbers_are_five_digits_in_range() {
        let generator = RegistrationNumberGenerator::default();
        for candidate in generator.candidates() {
            assert!(is_valid_number(&candidate), "{candidate}");
        }
    }

    #[test]
    fn fallback_stays_in_range() {
        assert!(is_valid_number(&RegistrationNumberGenerator::default().fallback()));
    }

    #[test]
    fn attempts_end_with_the_fallback() {
        let generator = RegistrationNumberGenerator::from_fn(|| 12_345);
        let attempts: Vec<String> = generator.attempts().collect();
        assert_eq!(attempts.len(), MAX_ATTEMPTS + 1);
        assert!(attempts[..MAX_ATTEMPTS].iter().all(|n| n == "12345"));
        assert!(is_valid_number(&attempts[MAX_ATTEMPTS]));
    }

    #[test]
    fn custom_source_is_used() {
        let counter = Arc::new(AtomicU32::new(12_344));
        let c = counter.clone();
        let generator = RegistrationNumberGenerator::from_fn(move || c.fetch_add(1, Ordering::SeqCst) + 1);
        assert_eq!(generator.candidate(), "12345");
        assert_eq!(generator.candidate(), "12346");
    }

    #[test]
    fn validates_format() {
        assert!(is_valid_number("10000"));
        assert!(!is_valid_number("09999"));
        assert!(!is_valid_number("1234"));
        assert!(!is_valid_number("12a45"));
    }
}
