/// Data required to register a new account.
///
/// The password arrives in plaintext and is hashed by the repository before
/// it is persisted.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}
