use bon::Builder;

/// Key sizes and validity periods applied by the store and the issuance service.
///
/// # Fields
/// * `ca_key_bits` - RSA modulus size for new CAs.
/// * `ca_validity_days` - Lifetime of a CA certificate.
/// * `client_key_bits` - RSA modulus size for client keys.
/// * `client_validity_days` - Lifetime of an issued client certificate.
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct CaPolicy {
    #[builder(default = 4096)]
    pub ca_key_bits: usize,
    #[builder(default = 3650)]
    pub ca_validity_days: i64,
    #[builder(default = 2048)]
    pub client_key_bits: usize,
    #[builder(default = 365)]
    pub client_validity_days: i64,
}

impl Default for CaPolicy {
    fn default() -> Self {
        CaPolicy::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let policy = CaPolicy::default();
        assert_eq!(policy.ca_key_bits, 4096);
        assert_eq!(policy.ca_validity_days, 3650);
        assert_eq!(policy.client_key_bits, 2048);
        assert_eq!(policy.client_validity_days, 365);

        let fast = CaPolicy::builder().ca_key_bits(2048).build();
        assert_eq!(fast.ca_key_bits, 2048);
        assert_eq!(fast.client_validity_days, 365);
    }
}
