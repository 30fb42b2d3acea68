//! Small integer helpers used by the `variations` identifier strategy.

pub fn fibonacci(n: u32) -> u128 {
    let (mut a, mut b) = (0u128, 1u128);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}

pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    let mut i = 2u64;
    while i * i <= n {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

/// Saturates at `u64::MAX` past 20!.
pub fn factorial(n: u32) -> u64 {
    (2..=n as u64).fold(1u64, |acc, k| acc.saturating_mul(k))
}
