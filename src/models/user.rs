use uuid::Uuid;

/// A stored user record.
///
/// Records are only ever produced by a store: the `id` is assigned once at
/// creation and is never nil.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub data: String,
    pub permissions: i32,
}

/// Fields supplied by a caller on create; the store assigns the `id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub data: String,
    pub permissions: i32,
}

impl NewUser {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            permissions: 0,
        }
    }

    pub fn with_permissions(mut self, permissions: i32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Attach a store-generated id.
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            name: self.name,
            data: self.data,
            permissions: self.permissions,
        }
    }
}

impl User {
    /// Case-sensitive substring match on name or data; an empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        self.name.contains(query) || self.data.contains(query)
    }
}
