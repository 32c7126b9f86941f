//! Process-local storage backend
//!
//! Every store trait is implemented over one state guarded by a single lock,
//! so the multi-row take/return/delete operations are atomic here as well.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    books::DUPLICATE_ISBN, users::USER_NOT_FOUND, AuthStore, BookStore, LoanStore, UserStore,
};
use crate::{
    error::{AppError, AppResult, LendingError},
    models::{user::UserRow, AuthDetails, AuthSession, Book, CreateBook, Role, User},
};

#[derive(Debug)]
struct StoredUser {
    row: UserRow,
    /// Book ids in the order they were taken
    taken: Vec<i32>,
    returned: Vec<i32>,
}

#[derive(Debug, Default)]
struct MemoryState {
    books: BTreeMap<i32, Book>,
    users: BTreeMap<i32, StoredUser>,
    auths: Vec<AuthSession>,
    next_book_id: i32,
    next_user_id: i32,
    next_auth_id: i32,
}

impl MemoryState {
    fn book_by_isbn(&self, isbn: &str) -> Option<&Book> {
        self.books.values().find(|b| b.isbn == isbn)
    }

    fn resolve(&self, ids: &[i32]) -> Vec<Book> {
        ids.iter().filter_map(|id| self.books.get(id).cloned()).collect()
    }

    fn to_user(&self, stored: &StoredUser) -> User {
        stored
            .row
            .clone()
            .into_user(self.resolve(&stored.taken), self.resolve(&stored.returned))
    }

    fn is_held(&self, book_id: i32) -> bool {
        self.users.values().any(|u| u.taken.contains(&book_id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn book_not_found(isbn: &str) -> AppError {
    AppError::NotFound(format!("book with this isbn: {} does not exist", isbn))
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        let _state = self.state.read().await;
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by(|a, b| a.isbn.cmp(&b.isbn));
        Ok(books)
    }

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        let state = self.state.read().await;
        state.book_by_isbn(isbn).cloned().ok_or_else(|| book_not_found(isbn))
    }

    async fn isbn_exists(&self, isbn: &str) -> AppResult<bool> {
        Ok(self.state.read().await.book_by_isbn(isbn).is_some())
    }

    async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        if state.book_by_isbn(&book.isbn).is_some() {
            return Err(AppError::Conflict(DUPLICATE_ISBN.to_string()));
        }

        state.next_book_id += 1;
        let now = Utc::now();
        let created = Book {
            id: state.next_book_id,
            isbn: book.isbn.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            available_units: book.available_units,
            created_at: now,
            updated_at: now,
        };
        state.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn is_taken(&self, isbn: &str) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state
            .book_by_isbn(isbn)
            .map(|b| state.is_held(b.id))
            .unwrap_or(false))
    }

    async fn delete(&self, isbn: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        let book_id = state.book_by_isbn(isbn).map(|b| b.id).ok_or_else(|| book_not_found(isbn))?;

        if state.is_held(book_id) {
            return Err(LendingError::BookAlreadyTaken.into());
        }

        for user in state.users.values_mut() {
            user.returned.retain(|id| *id != book_id);
        }
        state.books.remove(&book_id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().map(|u| state.to_user(u)).collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }

    async fn get_by_email(&self, email: &str) -> AppResult<User> {
        let state = self.state.read().await;
        state
            .users
            .values()
            .find(|u| u.row.email == email)
            .map(|u| state.to_user(u))
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let state = self.state.read().await;
        Ok(state.users.values().any(|u| u.row.email == email))
    }

    async fn create(&self, email: &str, password_hash: &str, role: Role) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.row.email == email) {
            return Err(AppError::Conflict("this user already exists".to_string()));
        }

        state.next_user_id += 1;
        let now = Utc::now();
        let row = UserRow {
            id: state.next_user_id,
            email: email.to_string(),
            password: password_hash.to_string(),
            role,
            created_at: now,
            updated_at: now,
        };
        let stored = StoredUser {
            row,
            taken: Vec::new(),
            returned: Vec::new(),
        };
        let user = state.to_user(&stored);
        state.users.insert(user.id, stored);
        Ok(user)
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_auth(&self, user_id: i32, role: Role) -> AppResult<AuthSession> {
        let mut state = self.state.write().await;
        state.next_auth_id += 1;
        let session = AuthSession {
            id: state.next_auth_id,
            user_id,
            auth_uuid: Uuid::new_v4(),
            role,
            created_at: Utc::now(),
        };
        state.auths.push(session.clone());
        Ok(session)
    }

    async fn fetch_auth(&self, details: &AuthDetails) -> AppResult<AuthSession> {
        let state = self.state.read().await;
        state
            .auths
            .iter()
            .find(|a| a.user_id == details.user_id && a.auth_uuid == details.auth_uuid)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    async fn delete_auth(&self, details: &AuthDetails) -> AppResult<()> {
        let mut state = self.state.write().await;
        let before = state.auths.len();
        state
            .auths
            .retain(|a| !(a.user_id == details.user_id && a.auth_uuid == details.auth_uuid));

        if state.auths.len() == before {
            return Err(AppError::NotFound("Session not found".to_string()));
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: i32) -> AppResult<u64> {
        let mut state = self.state.write().await;
        let before = state.auths.len();
        state.auths.retain(|a| a.user_id != user_id);
        Ok((before - state.auths.len()) as u64)
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn take(&self, user_id: i32, book_id: i32) -> AppResult<Book> {
        let mut state = self.state.write().await;

        // Validate everything before mutating anything
        let units = state
            .books
            .get(&book_id)
            .map(|b| b.available_units)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;
        if units <= 0 {
            return Err(LendingError::NoAvailableUnits.into());
        }
        let user = state
            .users
            .get(&user_id)
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
        if user.taken.contains(&book_id) {
            return Err(LendingError::BookAlreadyTaken.into());
        }

        if let Some(user) = state.users.get_mut(&user_id) {
            user.taken.push(book_id);
            user.returned.retain(|id| *id != book_id);
        }

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::Internal("book vanished during take".to_string()))?;
        book.available_units -= 1;
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn give_back(&self, user_id: i32, book_id: i32) -> AppResult<Book> {
        let mut state = self.state.write().await;

        if !state.books.contains_key(&book_id) {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;
        if !user.taken.contains(&book_id) {
            return Err(LendingError::BookIsNotTaken.into());
        }

        user.taken.retain(|id| *id != book_id);
        if !user.returned.contains(&book_id) {
            user.returned.push(book_id);
        }

        let book = state
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::Internal("book vanished during return".to_string()))?;
        book.available_units += 1;
        book.updated_at = Utc::now();
        Ok(book.clone())
    }
}
