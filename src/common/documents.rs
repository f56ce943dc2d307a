// src/common/documents.rs
// Regras de CPF e telefone brasileiros.

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Valida os dois dígitos verificadores de um CPF (apenas dígitos, 11 posições).
pub fn is_valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || cpf.len() != 11 {
        return false;
    }
    // 000.000.000-00, 111.111.111-11, ... passam no cálculo mas não existem
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    for position in 9..11 {
        let sum: u32 = digits[..position]
            .iter()
            .enumerate()
            .map(|(n, &d)| d * ((position as u32 + 1) - n as u32))
            .sum();
        let check = ((sum * 10) % 11) % 10;
        if check != digits[position] {
            return false;
        }
    }
    true
}

/// Telefone com DDD: 10 dígitos (fixo) ou 11 (celular).
pub fn is_valid_phone(phone: &str) -> bool {
    let len = digits_only(phone).len();
    (10..=11).contains(&len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_checksum_valid_cpfs() {
        assert!(is_valid_cpf("52998224725"));
        assert!(is_valid_cpf("11144477735"));
    }

    #[test]
    fn rejects_bad_cpfs() {
        assert!(!is_valid_cpf("52998224724"));
        assert!(!is_valid_cpf("11111111111"));
        assert!(!is_valid_cpf("1234567890"));
        assert!(!is_valid_cpf("529.982.247-25"));
        assert!(!is_valid_cpf(""));
    }

    #[test]
    fn phone_needs_ten_or_eleven_digits() {
        assert!(is_valid_phone("(11) 99999-8888"));
        assert!(is_valid_phone("1133334444"));
        assert!(!is_valid_phone("999998888"));
        assert!(!is_valid_phone("551199999888877"));
    }

    #[test]
    fn strips_formatting() {
        assert_eq!(digits_only("529.982.247-25"), "52998224725");
    }
}
