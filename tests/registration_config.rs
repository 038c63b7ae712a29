// crates.io
use jsonwebtoken::Algorithm;
// self
use oidc_login::{
	auth::IdentifierError,
	config::LoginConfig,
	error::ConfigError,
	flows::NoncePolicy,
	registration::{ClientAuthMethod, DEFAULT_CLOCK_SKEW, RegistrationError, RegistrationRepository},
};

const LINKEDIN: &str = r#"
nonce_policy = "skip"

[registrations.linkedin]
client_id = "client-123"
client_secret = "shh"
client_auth_method = "client_secret_post"
redirect_uri = "https://app.example.com/login/oauth2/code/linkedin"
authorization_uri = "https://www.linkedin.com/oauth/v2/authorization"
token_uri = "https://www.linkedin.com/oauth/v2/accessToken"
jwk_set_uri = "https://www.linkedin.com/oauth/openid/jwks"
user_info_uri = "https://api.linkedin.com/v2/userinfo"
issuer = "https://www.linkedin.com/oauth"
scopes = ["openid", "profile", "email"]
user_name_attribute = "email"
"#;

#[test]
fn registrations_load_from_toml() {
	let config = LoginConfig::from_toml_str(LINKEDIN).expect("Configuration should parse.");

	assert_eq!(config.nonce_policy, NoncePolicy::Skip);

	let repository = config.repository().expect("Registrations should validate.");
	let registration = repository.require("linkedin").expect("Registration should be present.");

	assert_eq!(registration.client_id, "client-123");
	assert_eq!(registration.client_auth_method, ClientAuthMethod::ClientSecretPost);
	assert_eq!(registration.id_token_signing_alg, Algorithm::RS256);
	assert_eq!(registration.clock_skew, DEFAULT_CLOCK_SKEW);
	assert_eq!(registration.user_name_attribute, "email");
	assert!(registration.scopes.is_openid());
	assert_eq!(
		registration.endpoints.user_info.as_ref().map(|url| url.as_str()),
		Some("https://api.linkedin.com/v2/userinfo")
	);
	assert!(matches!(
		repository.require("github"),
		Err(ConfigError::UnknownRegistration { id }) if id == "github"
	));
}

#[test]
fn nonce_policy_has_no_default() {
	let document = LINKEDIN.replace("nonce_policy = \"skip\"", "");
	let err = LoginConfig::from_toml_str(&document).expect_err("The nonce policy is mandatory.");

	assert!(matches!(err, ConfigError::Parse(_)));

	let enforcing = LINKEDIN.replace("\"skip\"", "\"enforce\"");

	assert_eq!(
		enforcing.parse::<LoginConfig>().expect("Configuration should parse.").nonce_policy,
		NoncePolicy::Enforce
	);
}

#[test]
fn invalid_registrations_are_reported_by_id() {
	let insecure = LINKEDIN.replace(
		"https://www.linkedin.com/oauth/v2/accessToken",
		"http://www.linkedin.com/oauth/v2/accessToken",
	);
	let err = LoginConfig::from_toml_str(&insecure)
		.expect("Configuration should parse.")
		.repository()
		.expect_err("Plain HTTP token endpoints must be rejected.");

	assert!(matches!(
		err,
		ConfigError::InvalidRegistration {
			ref id,
			source: RegistrationError::InsecureEndpoint { .. },
		} if id == "linkedin"
	));

	let secretless = LINKEDIN.replace("client_secret = \"shh\"\n", "");
	let err = LoginConfig::from_toml_str(&secretless)
		.expect("Configuration should parse.")
		.repository()
		.expect_err("Confidential clients need a secret.");

	assert!(matches!(
		err,
		ConfigError::InvalidRegistration { source: RegistrationError::MissingClientSecret { .. }, .. }
	));
}

#[test]
fn unknown_keys_are_rejected() {
	let document = format!("{LINKEDIN}\nunexpected = true\n");

	assert!(LoginConfig::from_toml_str(&document).is_err());
}

#[test]
fn registration_keys_must_be_path_safe() {
	let document = LINKEDIN.replace("[registrations.linkedin]", "[registrations.\"linked in\"]");
	let err = LoginConfig::from_toml_str(&document)
		.expect("Quoted keys are valid TOML.")
		.repository()
		.expect_err("A key with a space cannot name a redirect path.");

	assert!(matches!(
		err,
		ConfigError::InvalidIdentifier(IdentifierError::InvalidCharacter { found: ' ', position: 6 })
	));
}
