use certdesk::pkcs12::Pkcs12Bundle;
use certdesk::pki;

fn main() -> anyhow::Result<()> {
    // Generate the CA key and its self-signed certificate
    let ca_key = pki::generate_key_pair(4096)?;
    let ca_cert = pki::create_self_signed_certificate(&ca_key, "My Test CA", 3650)?;

    println!("CA Certificate PEM:\n{}", ca_cert.to_pem()?);

    // Generate a client key and a signing request for it
    let client_key = pki::generate_key_pair(2048)?;
    let csr = pki::create_signing_request(&client_key, "alice")?;
    println!("Client Request PEM:\n{}", csr.to_pem()?);

    // Sign the request with the CA
    let client_cert = pki::sign_certificate(&csr, &ca_key, &ca_cert, 365)?;
    client_cert.verify_signed_by(&ca_cert.public_key()?)?;
    println!("Client Certificate PEM:\n{}", client_cert.to_pem()?);

    // Package key and chain, then open the package again
    let p12 = pki::export_pkcs12(&client_key, &client_cert, &ca_cert, "changeit")?;
    let bundle = Pkcs12Bundle::open(&p12, "changeit")?;
    println!(
        "PKCS#12: {} bytes, serial {}, {} CA certificate(s)",
        p12.len(),
        bundle.certificate.serial_hex(),
        bundle.ca_certificates.len()
    );

    Ok(())
}
