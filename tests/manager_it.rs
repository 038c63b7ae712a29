mod common;

// std
use std::sync::Arc;
// crates.io
use serde_json::{Value, json};
// self
use common::*;
use oidc_login::{
	auth::{AuthoritySet, PrefixAuthoritiesMapper},
	error::{ConfigError, Error, OAuth2Error},
	flows::{AuthorizationResponse, NoncePolicy, OidcAuthenticationManager},
	jwt::StaticKeyVerifierFactory,
	registration::ClientRegistration,
};

const FAKE_IDP: &str = "https://idp.example.com";

fn manager(
	token_client: Arc<StubTokenClient>,
	loader: Arc<StubUserLoader>,
	nonce_policy: NoncePolicy,
) -> OidcAuthenticationManager {
	OidcAuthenticationManager::builder(token_client, loader)
		.verifier_factory(Arc::new(StaticKeyVerifierFactory::from_secret(HS256_SECRET)))
		.nonce_policy(nonce_policy)
		.build()
		.expect("Manager should build with every collaborator configured.")
}

fn shared_registration() -> Arc<ClientRegistration> {
	Arc::new(registration(FAKE_IDP))
}

fn code_response(state: &str) -> AuthorizationResponse {
	AuthorizationResponse::success("code-42", Some(state.to_owned()))
}

fn signed_id_token(overrides: Value) -> String {
	sign(&id_token_claims(overrides))
}

#[tokio::test]
async fn non_openid_attempts_are_declined_without_calls() {
	let token_client = StubTokenClient::returning(token_response(Some(signed_id_token(Value::Null))));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let outcome = manager
		.authenticate(attempt(
			&shared_registration(),
			&["profile", "email"],
			"abc",
			None,
			code_response("abc"),
		))
		.await
		.expect("Declining must not be an error.");

	assert!(outcome.is_none());
	assert_eq!(token_client.calls(), 0);
	assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn valid_attempt_yields_principal_with_mapped_authorities_and_exchanged_token() {
	let token_client = StubTokenClient::returning(token_response(Some(signed_id_token(Value::Null))));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let principal = manager
		.authenticate(attempt(&shared_registration(), &["openid"], "abc", None, code_response("abc")))
		.await
		.expect("Valid attempt should authenticate.")
		.expect("OIDC attempt should produce a principal.");
	let expected = ["USER"].into_iter().collect::<AuthoritySet>();

	assert_eq!(principal.authorities, expected);
	assert_eq!(principal.profile.authorities, expected);
	assert_eq!(principal.access_token.secret.expose(), "access-42");
	assert_eq!(principal.refresh_token.as_ref().map(|token| token.expose()), Some("refresh-42"));
	assert_eq!(principal.name(), SUBJECT);
	assert_eq!(principal.id_token.subject(), Some(SUBJECT));
	assert_eq!(principal.registration.id.as_ref(), REGISTRATION_ID);
	assert_eq!(token_client.calls(), 1);
	assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn provider_errors_surface_verbatim_without_calls() {
	let token_client = StubTokenClient::returning(token_response(Some(signed_id_token(Value::Null))));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let response = AuthorizationResponse::error(
		OAuth2Error::new("access_denied").with_description("The user denied the request."),
		Some("abc".into()),
	);
	let err = manager
		.authenticate(attempt(&shared_registration(), &["openid"], "abc", None, response))
		.await
		.expect_err("Provider errors must fail the attempt.");

	assert_eq!(err.code(), "access_denied");
	assert_eq!(
		err.oauth2_error().description.as_deref(),
		Some("The user denied the request.")
	);
	assert_eq!(token_client.calls(), 0);
	assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn state_mismatch_fails_before_the_exchange() {
	let token_client = StubTokenClient::returning(token_response(Some(signed_id_token(Value::Null))));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let registration = shared_registration();

	for response in [code_response("xyz"), AuthorizationResponse::success("code-42", None)] {
		let err = manager
			.authenticate(attempt(&registration, &["openid"], "abc", None, response))
			.await
			.expect_err("Mismatched state must fail the attempt.");

		assert!(matches!(err, Error::InvalidState));
		assert_eq!(err.code(), "invalid_state_parameter");
		assert!(!err.is_retryable());
	}

	assert_eq!(token_client.calls(), 0);
	assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn missing_id_token_names_the_registration() {
	let token_client = StubTokenClient::returning(token_response(None));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let err = manager
		.authenticate(attempt(&shared_registration(), &["openid"], "abc", None, code_response("abc")))
		.await
		.expect_err("A token response without id_token must fail.");

	assert_eq!(err.code(), "invalid_id_token");

	match &err {
		Error::InvalidIdToken { description } => assert_eq!(
			description,
			"Missing (required) ID Token in Token Response for Client Registration: mock-idp"
		),
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(token_client.calls(), 1);
	assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn bad_signatures_fail_without_loading_the_profile() {
	let forged = sign_with(&id_token_claims(Value::Null), Some(KID), b"attacker-controlled-secret");
	let token_client = StubTokenClient::returning(token_response(Some(forged)));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let err = manager
		.authenticate(attempt(&shared_registration(), &["openid"], "abc", None, code_response("abc")))
		.await
		.expect_err("A forged ID token must fail.");

	match &err {
		Error::InvalidIdToken { description } => assert!(description.contains("InvalidSignature")),
		other => panic!("Unexpected error: {other:?}."),
	}

	assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn expired_and_foreign_tokens_are_invalid_id_tokens() {
	let now = time::OffsetDateTime::now_utc().unix_timestamp();

	for overrides in [
		json!({ "exp": now - 3_600, "iat": now - 7_200 }),
		json!({ "aud": "another-client" }),
		json!({ "iss": "https://rogue.example.com" }),
	] {
		let token_client =
			StubTokenClient::returning(token_response(Some(signed_id_token(overrides.clone()))));
		let loader = StubUserLoader::granting(&["USER"]);
		let manager = manager(token_client, loader.clone(), NoncePolicy::Skip);
		let err = manager
			.authenticate(attempt(
				&shared_registration(),
				&["openid"],
				"abc",
				None,
				code_response("abc"),
			))
			.await
			.expect_err("Token failing standard claim checks must be rejected.");

		assert_eq!(err.code(), "invalid_id_token", "Overrides: {overrides}.");
		assert_eq!(loader.calls(), 0);
	}
}

#[tokio::test]
async fn skipped_nonce_policy_accepts_mismatched_nonces() {
	let token_client = StubTokenClient::returning(token_response(Some(signed_id_token(
		json!({ "nonce": "nonce-from-somewhere-else" }),
	))));
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client, loader, NoncePolicy::Skip);
	let principal = manager
		.authenticate(attempt(
			&shared_registration(),
			&["openid"],
			"abc",
			Some("nonce-sent-with-request"),
			code_response("abc"),
		))
		.await
		.expect("Nonce mismatch must not fail under the skip policy.");

	assert!(principal.is_some());
}

#[tokio::test]
async fn enforced_nonce_policy_compares_the_claim() {
	let registration = shared_registration();
	let mismatched = manager(
		StubTokenClient::returning(token_response(Some(signed_id_token(
			json!({ "nonce": "nonce-from-somewhere-else" }),
		)))),
		StubUserLoader::granting(&["USER"]),
		NoncePolicy::Enforce,
	);
	let err = mismatched
		.authenticate(attempt(&registration, &["openid"], "abc", Some("n-1"), code_response("abc")))
		.await
		.expect_err("Nonce mismatch must fail under the enforce policy.");

	assert!(matches!(err, Error::InvalidNonce));
	assert_eq!(err.code(), "invalid_nonce");

	let matching = manager(
		StubTokenClient::returning(token_response(Some(signed_id_token(json!({ "nonce": "n-1" }))))),
		StubUserLoader::granting(&["USER"]),
		NoncePolicy::Enforce,
	);

	assert!(
		matching
			.authenticate(attempt(&registration, &["openid"], "abc", Some("n-1"), code_response("abc")))
			.await
			.expect("Matching nonce should authenticate.")
			.is_some()
	);
}

#[tokio::test]
async fn exchange_failures_propagate_unchanged() {
	let token_client = StubTokenClient::failing(
		OAuth2Error::new("invalid_grant").with_description("Code already redeemed."),
	);
	let loader = StubUserLoader::granting(&["USER"]);
	let manager = manager(token_client.clone(), loader.clone(), NoncePolicy::Skip);
	let err = manager
		.authenticate(attempt(&shared_registration(), &["openid"], "abc", None, code_response("abc")))
		.await
		.expect_err("Exchange failures must fail the attempt.");

	assert!(matches!(&err, Error::Provider(inner) if inner.code == "invalid_grant"));
	assert_eq!(token_client.calls(), 1);
	assert_eq!(loader.calls(), 0);
}

#[tokio::test]
async fn configured_mapper_rewrites_authorities() {
	let token_client = StubTokenClient::returning(token_response(Some(signed_id_token(Value::Null))));
	let loader = StubUserLoader::granting(&["user", "admin"]);
	let manager = OidcAuthenticationManager::builder(token_client, loader)
		.verifier_factory(Arc::new(StaticKeyVerifierFactory::from_secret(HS256_SECRET)))
		.authorities_mapper(Arc::new(PrefixAuthoritiesMapper::new("ROLE_").uppercase()))
		.nonce_policy(NoncePolicy::Skip)
		.build()
		.expect("Manager should build.");
	let principal = manager
		.authenticate(attempt(&shared_registration(), &["openid"], "abc", None, code_response("abc")))
		.await
		.expect("Valid attempt should authenticate.")
		.expect("OIDC attempt should produce a principal.");

	assert!(principal.has_authority("ROLE_USER"));
	assert!(principal.has_authority("ROLE_ADMIN"));
	assert!(principal.profile.authorities.contains("user"));
}

#[test]
fn builder_requires_a_verifier_factory_and_a_nonce_policy() {
	let token_client = StubTokenClient::returning(token_response(None));
	let loader = StubUserLoader::granting(&[]);
	let err = OidcAuthenticationManager::builder(token_client.clone(), loader.clone())
		.nonce_policy(NoncePolicy::Skip)
		.build()
		.expect_err("A manager without verifier factory must not build.");

	assert!(matches!(err, ConfigError::MissingVerifierFactory));

	let err = OidcAuthenticationManager::builder(token_client, loader)
		.verifier_factory(Arc::new(StaticKeyVerifierFactory::from_secret(HS256_SECRET)))
		.build()
		.expect_err("A manager without nonce policy must not build.");

	assert!(matches!(err, ConfigError::MissingNoncePolicy));
}

#[test]
fn manager_is_shareable_across_tasks() {
	fn assert_send_sync<T: Send + Sync>() {}

	assert_send_sync::<OidcAuthenticationManager>();
}
