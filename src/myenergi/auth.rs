// HTTP Digest access authentication, as required by the myenergi director and
// API servers.  The challenge parsing and hashing is done by `digest_auth`.

use ::digest_auth::AuthContext;

use crate::error::Error;

/// True if a `WWW-Authenticate` value is a digest challenge.
pub fn is_digest(challenge: &str) -> bool {
    challenge
        .trim_start()
        .get(..6)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("digest"))
}

/// Value of the `Authorization` header answering `challenge` for a GET of
/// `uri` (path and query).
pub fn authorization(
    challenge: &str,
    user_name: &str,
    password: &str,
    uri: &str,
) -> Result<String, Error> {
    answer(challenge, &AuthContext::new(user_name, password, uri))
}

fn answer(challenge: &str, context: &AuthContext) -> Result<String, Error> {
    let bad_challenge = |e: ::digest_auth::Error| {
        Error::EndpointUnavailable(format!("Cannot answer digest challenge {}: {}", challenge, e))
    };
    let mut prompt = ::digest_auth::parse(challenge).map_err(bad_challenge)?;
    let answer = prompt.respond(context).map_err(bad_challenge)?;
    Ok(answer.to_header_string())
}
