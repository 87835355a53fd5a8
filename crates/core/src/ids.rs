use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.0.to_string()[..8])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(TrackId);
uuid_id!(ListId);

impl TrackId {
    /// Identity of a track that has not been confirmed into a list yet.
    pub const UNASSIGNED: TrackId = TrackId(Uuid::nil());

    pub fn is_unassigned(&self) -> bool {
        self.0.is_nil()
    }
}

/// Tracks start out unassigned; a list hands out real identities.
impl Default for TrackId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl Default for ListId {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands out fresh track identities. Never returns [`TrackId::UNASSIGNED`].
pub trait IdentityResolver {
    fn next_id(&mut self) -> TrackId;
}

impl<R: IdentityResolver + ?Sized> IdentityResolver for Box<R> {
    fn next_id(&mut self) -> TrackId {
        (**self).next_id()
    }
}

/// Time-ordered UUIDv7 identities.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidResolver;

impl IdentityResolver for UuidResolver {
    fn next_id(&mut self) -> TrackId {
        TrackId::new()
    }
}

/// Deterministic identities 1, 2, 3, ... encoded as UUIDs.
#[derive(Debug, Clone)]
pub struct SequentialResolver {
    next: u128,
}

impl Default for SequentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialResolver {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn starting_at(next: u128) -> Self {
        Self { next: next.max(1) }
    }
}

impl IdentityResolver for SequentialResolver {
    fn next_id(&mut self) -> TrackId {
        let id = TrackId::from_uuid(Uuid::from_u128(self.next));
        self.next += 1;
        id
    }
}

/// blake3 digest of a serialized state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}...)", self.0[0], self.0[1])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}
