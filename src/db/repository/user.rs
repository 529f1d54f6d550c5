use uuid::Uuid;

use super::decode_all;
use crate::db::{Collection, DatabaseError, Filter, RecordStore};
use crate::models::UserAccount;

pub fn insert_user(store: &dyn RecordStore, user: &UserAccount) -> Result<Uuid, DatabaseError> {
    let doc = serde_json::to_value(user)?;
    store.insert(Collection::Users, &doc)
}

pub fn find_user_by_username(
    store: &dyn RecordStore,
    username: &str,
) -> Result<Option<UserAccount>, DatabaseError> {
    let docs = store.find(Collection::Users, &Filter::eq("username", username), None)?;
    Ok(decode_all(Collection::Users.as_str(), docs).into_iter().next())
}

pub fn count_users(store: &dyn RecordStore) -> Result<usize, DatabaseError> {
    store.count(Collection::Users)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryRecordStore;

    #[test]
    fn insert_then_find_by_username() {
        let store = MemoryRecordStore::new();
        let user = UserAccount::new("alice", "pbkdf2:sha256:1$c2FsdA$aGFzaA".into());
        insert_user(&store, &user).unwrap();

        let found = find_user_by_username(&store, "alice").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(find_user_by_username(&store, "bob").unwrap().is_none());
        assert_eq!(count_users(&store).unwrap(), 1);
    }

    #[test]
    fn duplicate_username_is_constraint_violation() {
        let store = MemoryRecordStore::new();
        insert_user(&store, &UserAccount::new("alice", "h".into())).unwrap();
        let err = insert_user(&store, &UserAccount::new("alice", "h".into())).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
