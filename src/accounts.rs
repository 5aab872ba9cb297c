use crate::error::RepositoryError;
use crate::models::{User, UserRecord};
use crate::storage::RecordStore;

/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wrap-around, rendered as
/// the decimal absolute value.
///
/// This keeps plain text out of the data file and nothing more; it is not a
/// credential store.
pub fn generate_hash(value: &str) -> String {
    let hash = value.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    });
    i64::from(hash).abs().to_string()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Passwords are lowercased before hashing so hashes match those already stored in
/// existing `users.json` files. Login is therefore case-insensitive.
pub fn password_hash(password: &str) -> String {
    generate_hash(&password.to_lowercase())
}

pub fn signup<S: RecordStore + ?Sized>(
    store: &S,
    email: &str,
    password: &str,
) -> Result<User, RepositoryError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(RepositoryError::InvalidCredentials);
    }
    let mut records = store.load_all_records()?;
    if records.iter().any(|record| record.user.email == email) {
        return Err(RepositoryError::DuplicateUser(email));
    }
    let user = User {
        email,
        password: password_hash(password),
    };
    records.push(UserRecord::new(user.clone()));
    store.save_all_records(&records)?;
    store.set_active_user(Some(&user))?;
    log::info!("accounts: signed up email={}", user.email);
    Ok(user)
}

pub fn login<S: RecordStore + ?Sized>(
    store: &S,
    email: &str,
    password: &str,
) -> Result<User, RepositoryError> {
    let email = normalize_email(email);
    let hash = password_hash(password);
    let user = store
        .load_all_records()?
        .into_iter()
        .map(|record| record.user)
        .find(|user| user.email == email && user.password == hash)
        .ok_or(RepositoryError::InvalidCredentials)?;
    store.set_active_user(Some(&user))?;
    log::info!("accounts: logged in email={}", user.email);
    Ok(user)
}

pub fn logout<S: RecordStore + ?Sized>(store: &S) -> Result<(), RepositoryError> {
    store.set_active_user(None)?;
    Ok(())
}

pub fn current_user<S: RecordStore + ?Sized>(store: &S) -> Result<Option<User>, RepositoryError> {
    Ok(store.active_user()?)
}

/// Removes the active user's record together with its tasks and logs them out.
pub fn delete_account<S: RecordStore + ?Sized>(store: &S) -> Result<User, RepositoryError> {
    let active = store.active_user()?.ok_or(RepositoryError::NoActiveUser)?;
    let mut records = store.load_all_records()?;
    let index = records
        .iter()
        .position(|record| record.user.email == active.email)
        .ok_or_else(|| RepositoryError::UserNotFound(active.email.clone()))?;
    let removed = records.remove(index);
    store.save_all_records(&records)?;
    store.set_active_user(None)?;
    log::info!("accounts: deleted email={}", removed.user.email);
    Ok(removed.user)
}
