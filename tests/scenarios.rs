//! End-to-end scenarios: key files on disk, packets, signatures

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use hybridcrypt::cli;
use hybridcrypt::cli::newkey::NewKeyOptions;
use hybridcrypt::cli::sign::SignatureSource;
use hybridcrypt::crypto::{self, hybrid, HashAlgorithm, KeyPair, PacketHeader};
use hybridcrypt::ErrorKind;
use secrecy::SecretString;
use tempfile::TempDir;

/// Iterations for password-protected test keys; the format is what matters here
const TEST_ITERATIONS: u32 = 2_000;

/// Password fed to the CLI prompts through the environment
const CLI_PASSWORD: &str = "scenario-password";

fn fixture() -> &'static KeyPair {
    static KEY: OnceLock<KeyPair> = OnceLock::new();
    KEY.get_or_init(|| KeyPair::generate(2048).unwrap())
}

/// Answer every CLI password prompt with [`CLI_PASSWORD`]
///
/// All tests set the same value, so running them in parallel is harmless.
fn cli_password() -> SecretString {
    std::env::set_var(cli::PASSWORD_ENV, CLI_PASSWORD);
    SecretString::new(CLI_PASSWORD.to_string())
}

fn newkey_options(dir: &Path, key_name: &str, protect: bool) -> NewKeyOptions {
    NewKeyOptions {
        key_size: 1024,
        key_name: key_name.to_string(),
        output_dir: dir.to_path_buf(),
        protect,
        pbkdf2_iterations: TEST_ITERATIONS,
    }
}

/// Encrypt with `encryptor`, decrypt with `decryptor`, sign with `signer`, verify with `verifier`
fn assert_interoperable(encryptor: &KeyPair, decryptor: &KeyPair, signer: &KeyPair, verifier: &KeyPair) {
    let data = b"interoperability check across key copies";

    let packet = crypto::encrypt(encryptor, data).unwrap();
    assert_eq!(&*crypto::decrypt(decryptor, &packet).unwrap(), &data[..]);

    for hash in HashAlgorithm::ALL {
        let signature = crypto::sign(signer, data, hash.name()).unwrap();
        assert!(crypto::verify(verifier, data, &signature, hash.name()).unwrap());
    }
}

#[test]
fn test_37_byte_packet_scenario() {
    let keypair = fixture();
    let payload: Vec<u8> = (0u8..37).collect();

    let packet = crypto::encrypt(keypair, &payload).unwrap();
    let header = PacketHeader::parse(&packet).unwrap();

    assert_eq!(header.len_key, 256);
    assert_eq!(header.len_iv, 16);
    assert_eq!(packet.len(), 8 + header.len_key as usize + header.len_iv as usize + 48);

    let decrypted = crypto::decrypt(keypair, &packet).unwrap();
    assert_eq!(&*decrypted, &payload[..]);
}

#[test]
fn test_roundtrip_payload_sizes() {
    let keypair = fixture();
    for len in [0usize, 1, 15, 16, 17, 37, 255, 65_537] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
        let packet = crypto::encrypt(keypair, &payload).unwrap();
        assert_eq!(
            packet.len(),
            hybrid::HEADER_LEN + 256 + hybrid::IV_LEN + hybrid::ciphertext_len(len)
        );
        assert_eq!(&*crypto::decrypt(keypair, &packet).unwrap(), &payload[..]);
    }
}

#[test]
fn test_key_size_boundaries() {
    assert_eq!(KeyPair::generate(383).unwrap_err().kind(), ErrorKind::InvalidParameter);
    assert_eq!(KeyPair::generate(16385).unwrap_err().kind(), ErrorKind::InvalidParameter);
}

#[test]
fn test_4096_bit_pem_roundtrip() {
    let dir = TempDir::new().unwrap();
    let keypair = KeyPair::generate(4096).unwrap();
    assert_eq!(keypair.key_size(), 4096);

    let base = dir.path().join("big");
    let public = KeyPair::import_pem(keypair.export_pem(&base, false).unwrap()).unwrap();
    let private = KeyPair::import_pem(keypair.export_pem(&base, true).unwrap()).unwrap();

    assert_eq!(public.key_size(), 4096);
    assert_interoperable(&public, &private, &private, &public);
    assert_interoperable(&keypair, &private, &keypair, &public);
}

#[test]
fn test_keys_above_4096_bits_reimport() {
    let dir = TempDir::new().unwrap();
    let keypair = KeyPair::generate(4608).unwrap();

    let base = dir.path().join("huge");
    let public = KeyPair::import_pem(keypair.export_pem(&base, false).unwrap()).unwrap();
    let private = KeyPair::import_pem(keypair.export_pem(&base, true).unwrap()).unwrap();
    assert!(public.is_public_only());
    assert_eq!(public.key_size(), 4608);
    assert_eq!(public.public_key(), keypair.public_key());

    let from_blob = KeyPair::import_blob(&keypair.export_blob(false).unwrap()).unwrap();
    assert!(from_blob.is_public_only());
    assert_eq!(from_blob.public_key(), keypair.public_key());

    let packet = crypto::encrypt(&public, b"large modulus").unwrap();
    assert_eq!(
        PacketHeader::parse(&packet).unwrap().len_key as usize,
        keypair.signature_len()
    );
    assert_eq!(&*crypto::decrypt(&private, &packet).unwrap(), b"large modulus");

    let signature = crypto::sign(&private, b"large modulus", "SHA512").unwrap();
    assert!(crypto::verify(&from_blob, b"large modulus", &signature, "SHA512").unwrap());
}

#[test]
fn test_pem_files_follow_naming_convention() {
    let dir = TempDir::new().unwrap();
    let keypair = fixture();
    let base = dir.path().join("alice");
    let password = SecretString::new("correct horse battery".to_string());

    let public_path = keypair.export_pem(&base, false).unwrap();
    let private_path = keypair.export_pem(&base, true).unwrap();
    let encrypted_path = keypair
        .export_encrypted_private_with(&password, &base, TEST_ITERATIONS)
        .unwrap();

    assert_eq!(public_path, dir.path().join("pub.alice.pem"));
    assert_eq!(private_path, dir.path().join("priv.alice.pem"));
    assert_eq!(encrypted_path, dir.path().join("enc.alice.pem"));

    assert!(!fs::metadata(&public_path).unwrap().permissions().readonly());
    assert!(fs::metadata(&private_path).unwrap().permissions().readonly());
    assert!(fs::metadata(&encrypted_path).unwrap().permissions().readonly());

    // Exporting again overwrites the read-only file
    keypair.export_pem(&base, true).unwrap();
}

#[test]
fn test_public_only_restrictions() {
    let dir = TempDir::new().unwrap();
    let keypair = fixture();
    let public = KeyPair::import_pem(keypair.export_pem(dir.path().join("k"), false).unwrap()).unwrap();
    assert!(public.is_public_only());

    let packet = crypto::encrypt(&public, b"hello").unwrap();
    assert_eq!(crypto::decrypt(&public, &packet).unwrap_err().kind(), ErrorKind::InvalidOperation);
    assert_eq!(&*crypto::decrypt(keypair, &packet).unwrap(), b"hello");

    assert_eq!(
        crypto::sign(&public, b"hello", "SHA256").unwrap_err().kind(),
        ErrorKind::InvalidOperation
    );
    let signature = crypto::sign(keypair, b"hello", "SHA256").unwrap();
    assert!(crypto::verify(&public, b"hello", &signature, "SHA256").unwrap());

    assert_eq!(
        public.export_pem(dir.path().join("k"), true).unwrap_err().kind(),
        ErrorKind::InvalidOperation
    );
    let password = SecretString::new("pw".to_string());
    assert_eq!(
        public
            .export_encrypted_private(&password, dir.path().join("k"))
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidOperation
    );
}

#[test]
fn test_password_protected_roundtrip() {
    let dir = TempDir::new().unwrap();
    let keypair = fixture();
    let password = SecretString::new("correct horse battery".to_string());

    let path = keypair
        .export_encrypted_private_with(&password, dir.path().join("bob"), TEST_ITERATIONS)
        .unwrap();

    let restored = KeyPair::import_encrypted_private(&password, &path).unwrap();
    assert!(!restored.is_public_only());
    assert_interoperable(keypair, &restored, &restored, keypair);

    let wrong = SecretString::new("incorrect horse battery".to_string());
    assert_eq!(
        KeyPair::import_encrypted_private(&wrong, &path).unwrap_err().kind(),
        ErrorKind::WrongPassword
    );

    // A protected file is not readable as a plain PEM
    assert_eq!(KeyPair::import_pem(&path).unwrap_err().kind(), ErrorKind::InvalidFormat);
}

#[test]
fn test_missing_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("pub.nobody.pem");
    let password = SecretString::new("pw".to_string());

    assert_eq!(KeyPair::import_pem(&missing).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        KeyPair::import_encrypted_private(&password, &missing).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_malformed_pem_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pub.broken.pem");
    fs::write(&path, "-----BEGIN PUBLIC KEY-----\nnot base64 at all\n-----END PUBLIC KEY-----\n").unwrap();

    assert_eq!(KeyPair::import_pem(&path).unwrap_err().kind(), ErrorKind::InvalidFormat);
}

#[test]
fn test_blob_roundtrip_is_functional() {
    let keypair = fixture();

    let private = KeyPair::import_blob(&keypair.export_blob(true).unwrap()).unwrap();
    let public = KeyPair::import_blob(&keypair.export_blob(false).unwrap()).unwrap();
    assert!(public.is_public_only());

    assert_interoperable(&public, &private, &private, &public);
}

#[test]
fn test_shared_key_across_threads() {
    let keypair = fixture();

    std::thread::scope(|scope| {
        for i in 0..4u8 {
            scope.spawn(move || {
                let payload = vec![i; 100 + i as usize];
                let packet = crypto::encrypt(keypair, &payload).unwrap();
                assert_eq!(&*crypto::decrypt(keypair, &packet).unwrap(), &payload[..]);
            });
        }
    });
}

#[test]
fn test_cli_file_encrypt_decrypt() {
    let dir = TempDir::new().unwrap();
    let keypair = fixture();
    let base = dir.path().join("carol");
    let public_path = keypair.export_pem(&base, false).unwrap();
    let private_path = keypair.export_pem(&base, true).unwrap();

    let input = dir.path().join("notes.txt");
    fs::write(&input, b"meeting moved to thursday").unwrap();

    let encrypted = cli::encrypt::encrypt(&public_path, &input, None).unwrap();
    assert_eq!(encrypted, dir.path().join("notes.txt.hyb"));
    assert_ne!(fs::read(&encrypted).unwrap(), b"meeting moved to thursday");

    let output = dir.path().join("notes.out");
    let decrypted = cli::encrypt::decrypt(&private_path, &encrypted, Some(output.clone())).unwrap();
    assert_eq!(decrypted, output);
    assert_eq!(fs::read(&output).unwrap(), b"meeting moved to thursday");

    let err = cli::encrypt::decrypt(&public_path, &encrypted, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_cli_detached_and_merged_signatures() {
    let dir = TempDir::new().unwrap();
    let keypair = fixture();
    let base = dir.path().join("dave");
    let public_path = keypair.export_pem(&base, false).unwrap();
    let private_path = keypair.export_pem(&base, true).unwrap();

    let input = dir.path().join("release.tar");
    fs::write(&input, b"release contents").unwrap();

    let detached =
        cli::sign::sign(&private_path, &input, HashAlgorithm::Sha384, false, None).unwrap();
    assert_eq!(fs::read(&detached).unwrap().len(), keypair.signature_len());
    let source = SignatureSource::Detached(detached.clone());
    assert!(cli::sign::verify(&public_path, &input, HashAlgorithm::Sha384, &source).unwrap());
    assert!(!cli::sign::verify(&public_path, &input, HashAlgorithm::Sha256, &source).unwrap());

    let merged = cli::sign::sign(&private_path, &input, HashAlgorithm::Sha256, true, None).unwrap();
    assert_eq!(
        fs::read(&merged).unwrap().len(),
        b"release contents".len() + keypair.signature_len()
    );
    assert!(cli::sign::verify(&public_path, &merged, HashAlgorithm::Sha256, &SignatureSource::Merged).unwrap());

    let mut tampered = fs::read(&merged).unwrap();
    tampered[0] ^= 0x20;
    fs::write(&merged, &tampered).unwrap();
    assert!(!cli::sign::verify(&public_path, &merged, HashAlgorithm::Sha256, &SignatureSource::Merged).unwrap());
}

#[test]
fn test_cli_newkey_plain() {
    let dir = TempDir::new().unwrap();

    cli::newkey::run(&newkey_options(dir.path(), "erin", false)).unwrap();

    let public = KeyPair::import_pem(dir.path().join("pub.erin.pem")).unwrap();
    let private_path = dir.path().join("priv.erin.pem");
    let private = KeyPair::import_pem(&private_path).unwrap();
    assert!(fs::metadata(&private_path).unwrap().permissions().readonly());
    assert!(!dir.path().join("enc.erin.pem").exists());

    assert_eq!(public.key_size(), 1024);
    assert_interoperable(&public, &private, &private, &public);
}

#[test]
fn test_cli_newkey_protected() {
    let dir = TempDir::new().unwrap();
    let password = cli_password();

    cli::newkey::run(&newkey_options(dir.path(), "frank", true)).unwrap();

    let public_path = dir.path().join("pub.frank.pem");
    let encrypted_path = dir.path().join("enc.frank.pem");
    assert!(public_path.exists());
    assert!(encrypted_path.exists());
    assert!(!dir.path().join("priv.frank.pem").exists());

    let public = KeyPair::import_pem(&public_path).unwrap();
    let private = KeyPair::import_encrypted_private(&password, &encrypted_path).unwrap();
    assert_interoperable(&public, &private, &private, &public);

    // Protected keys are usable directly from the CLI commands
    let input = dir.path().join("memo.txt");
    fs::write(&input, b"quarterly numbers").unwrap();
    let encrypted = cli::encrypt::encrypt(&public_path, &input, None).unwrap();
    let output = dir.path().join("memo.out");
    cli::encrypt::decrypt(&encrypted_path, &encrypted, Some(output.clone())).unwrap();
    assert_eq!(fs::read(&output).unwrap(), b"quarterly numbers");
}

#[test]
fn test_cli_protect_unprotect_roundtrip() {
    let dir = TempDir::new().unwrap();
    let password = cli_password();
    cli::newkey::run(&newkey_options(dir.path(), "grace", false)).unwrap();

    let public = KeyPair::import_pem(dir.path().join("pub.grace.pem")).unwrap();
    let plain_path = dir.path().join("priv.grace.pem");

    let protected_dir = dir.path().join("protected");
    let encrypted_path = cli::protect::protect(&plain_path, Some(&protected_dir), TEST_ITERATIONS).unwrap();
    assert_eq!(encrypted_path, protected_dir.join("enc.grace.pem"));
    assert_eq!(
        KeyPair::import_pem(&encrypted_path).unwrap_err().kind(),
        ErrorKind::InvalidFormat
    );
    let protected = KeyPair::import_encrypted_private(&password, &encrypted_path).unwrap();
    assert_interoperable(&public, &protected, &protected, &public);

    let restored_dir = dir.path().join("restored");
    let restored_path = cli::protect::unprotect(&encrypted_path, Some(&restored_dir)).unwrap();
    assert_eq!(restored_path, restored_dir.join("priv.grace.pem"));

    let restored = KeyPair::import_pem(&restored_path).unwrap();
    assert_eq!(restored.public_key(), public.public_key());
    assert_interoperable(&public, &restored, &restored, &public);

    // A public key has nothing to protect
    let err = cli::protect::protect(&dir.path().join("pub.grace.pem"), None, TEST_ITERATIONS).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}
