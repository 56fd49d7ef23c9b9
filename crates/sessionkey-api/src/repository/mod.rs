//! 데이터베이스 저장소.

pub mod users;

pub use users::{
    MemoryUserRepository, NewUser, PgUserRepository, RepositoryError, RepositoryResult, User,
    UserProfile, UserRepository,
};
