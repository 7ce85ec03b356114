mod util;

use botan::Certificate as BotanCertificate;

use certdesk::cert::Certificate;
use certdesk::key::KeyPair;

fn check_cert(cert_der: &[u8]) {
    // Use botan crate to parse the DER and assert it succeeds
    BotanCertificate::load(cert_der).expect("Botan failed to parse certificate");
}

#[test]
#[ignore]
fn test_botan_self_signed_rsa() {
    let key_pair = KeyPair::generate_rsa(2048).unwrap();
    let cert = Certificate::new_self_signed(&key_pair, "crabs.crabs", 3650).unwrap();
    check_cert(&cert.to_der().unwrap());
}

#[test]
#[ignore]
fn test_botan_issued_client() {
    let store = util::memory_store();
    let service = certdesk::issuance::IssuanceService::new(store);
    let ca = service.store().create_ca("acme").unwrap();
    let bundle = service.issue_client_certificate("acme", "alice").unwrap();

    check_cert(&ca.certificate().to_der().unwrap());
    check_cert(&bundle.certificate().to_der().unwrap());
}
