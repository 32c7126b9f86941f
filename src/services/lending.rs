//! Book lending: the take/return state machine
//!
//! For one (user, book) pair the book is either not held, held, or in the
//! user's returned history. Taking moves it to held (and out of the history),
//! returning moves it from held to the history. The unit count and both lists
//! are written by a single [`LoanStore`](crate::repository::LoanStore) call.

use crate::{
    error::{AppResult, LendingError},
    models::Book,
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Lend one unit of a book to a user
    pub async fn take_book(&self, email: &str, isbn: &str) -> AppResult<Book> {
        let user = self.repository.users.get_by_email(email).await?;
        let book = self.repository.books.get_by_isbn(isbn).await?;

        if user.has_taken(isbn) {
            return Err(LendingError::BookAlreadyTaken.into());
        }
        if book.available_units <= 0 {
            return Err(LendingError::NoAvailableUnits.into());
        }

        // The store re-checks both conditions inside its transaction
        let book = self.repository.loans.take(user.id, book.id).await?;

        tracing::info!(
            user_id = user.id,
            isbn,
            available_units = book.available_units,
            re_borrowed = user.has_returned(isbn),
            "Book taken"
        );
        Ok(book)
    }

    /// Take back a unit the user currently holds
    pub async fn return_book(&self, email: &str, isbn: &str) -> AppResult<Book> {
        if !self.is_book_taken_by_user(email, isbn).await {
            return Err(LendingError::BookIsNotTaken.into());
        }

        let book = self.repository.books.get_by_isbn(isbn).await?;
        let user = self.repository.users.get_by_email(email).await?;

        let book = self.repository.loans.give_back(user.id, book.id).await?;

        tracing::info!(
            user_id = user.id,
            isbn,
            available_units = book.available_units,
            "Book returned"
        );
        Ok(book)
    }

    /// `false` when either lookup fails
    pub async fn is_book_taken_by_user(&self, email: &str, isbn: &str) -> bool {
        let book = match self.repository.books.get_by_isbn(isbn).await {
            Ok(book) => book,
            Err(e) => {
                tracing::debug!("Book lookup failed for {}: {}", isbn, e);
                return false;
            }
        };

        let user = match self.repository.users.get_by_email(email).await {
            Ok(user) => user,
            Err(e) => {
                tracing::debug!("User lookup failed for {}: {}", email, e);
                return false;
            }
        };

        user.has_taken(&book.isbn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    use crate::{
        error::AppError,
        models::{CreateBook, Role, User},
        repository::{MockAuthStore, MockBookStore, MockLoanStore, MockUserStore},
    };

    const ISBN: &str = "978-0441013593";

    async fn setup(units: i32) -> (LendingService, Repository) {
        let repository = Repository::in_memory();
        repository
            .books
            .create(&CreateBook {
                isbn: ISBN.to_string(),
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                available_units: units,
            })
            .await
            .unwrap();
        for email in ["alice@example.com", "bob@example.com"] {
            repository.users.create(email, "hash", Role::User).await.unwrap();
        }
        (LendingService::new(repository.clone()), repository)
    }

    #[tokio::test]
    async fn test_take_last_unit() {
        let (lending, repository) = setup(1).await;

        let book = lending.take_book("alice@example.com", ISBN).await.unwrap();
        assert_eq!(book.available_units, 0);

        let alice = repository.users.get_by_email("alice@example.com").await.unwrap();
        assert!(alice.has_taken(ISBN));
        assert_eq!(repository.books.get_by_isbn(ISBN).await.unwrap().available_units, 0);

        let again = lending.take_book("alice@example.com", ISBN).await.unwrap_err();
        assert!(matches!(again, AppError::Lending(LendingError::BookAlreadyTaken)));

        let other = lending.take_book("bob@example.com", ISBN).await.unwrap_err();
        assert!(matches!(other, AppError::Lending(LendingError::NoAvailableUnits)));
    }

    #[tokio::test]
    async fn test_return_then_take_again() {
        let (lending, repository) = setup(2).await;

        lending.take_book("alice@example.com", ISBN).await.unwrap();
        let returned = lending.return_book("alice@example.com", ISBN).await.unwrap();
        assert_eq!(returned.available_units, 2);

        let alice = repository.users.get_by_email("alice@example.com").await.unwrap();
        assert!(!alice.has_taken(ISBN));
        assert!(alice.has_returned(ISBN));

        let taken = lending.take_book("alice@example.com", ISBN).await.unwrap();
        assert_eq!(taken.available_units, 1);

        let alice = repository.users.get_by_email("alice@example.com").await.unwrap();
        assert!(alice.has_taken(ISBN));
        assert!(!alice.has_returned(ISBN));
    }

    #[tokio::test]
    async fn test_return_requires_holding_the_book() {
        let (lending, _) = setup(1).await;

        let err = lending.return_book("alice@example.com", ISBN).await.unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingError::BookIsNotTaken)));

        lending.take_book("alice@example.com", ISBN).await.unwrap();
        let err = lending.return_book("bob@example.com", ISBN).await.unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingError::BookIsNotTaken)));
    }

    #[tokio::test]
    async fn test_is_book_taken_by_user_swallows_lookup_failures() {
        let (lending, _) = setup(1).await;
        lending.take_book("alice@example.com", ISBN).await.unwrap();

        assert!(lending.is_book_taken_by_user("alice@example.com", ISBN).await);
        assert!(!lending.is_book_taken_by_user("bob@example.com", ISBN).await);
        assert!(!lending.is_book_taken_by_user("nobody@example.com", ISBN).await);
        assert!(!lending.is_book_taken_by_user("alice@example.com", "unknown").await);
    }

    #[tokio::test]
    async fn test_take_unknown_user_or_book() {
        let (lending, _) = setup(1).await;

        let err = lending.take_book("nobody@example.com", ISBN).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = lending.take_book("alice@example.com", "unknown").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_takes_of_last_unit() {
        let (lending, repository) = setup(1).await;

        let (a, b) = tokio::join!(
            lending.take_book("alice@example.com", ISBN),
            lending.take_book("bob@example.com", ISBN)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(repository.books.get_by_isbn(ISBN).await.unwrap().available_units, 0);
    }

    fn fixture_user() -> User {
        let now = Utc::now();
        User {
            id: 1,
            email: "alice@example.com".to_string(),
            password: String::new(),
            role: Role::User,
            taken_books: vec![],
            returned_books: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn fixture_book() -> Book {
        let now = Utc::now();
        Book {
            id: 9,
            isbn: ISBN.to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            available_units: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn mocked(loans: MockLoanStore) -> LendingService {
        let mut users = MockUserStore::new();
        users.expect_get_by_email().returning(|_| Ok(fixture_user()));
        let mut books = MockBookStore::new();
        books.expect_get_by_isbn().returning(|_| Ok(fixture_book()));

        LendingService::new(Repository {
            books: Arc::new(books),
            users: Arc::new(users),
            auths: Arc::new(MockAuthStore::new()),
            loans: Arc::new(loans),
        })
    }

    #[tokio::test]
    async fn test_store_rejection_after_precondition_passes() {
        // Another request claimed the last unit between the check and the write
        let mut loans = MockLoanStore::new();
        loans
            .expect_take()
            .withf(|user_id, book_id| *user_id == 1 && *book_id == 9)
            .times(1)
            .returning(|_, _| Err(LendingError::NoAvailableUnits.into()));

        let err = mocked(loans).take_book("alice@example.com", ISBN).await.unwrap_err();
        assert!(matches!(err, AppError::Lending(LendingError::NoAvailableUnits)));
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let mut loans = MockLoanStore::new();
        loans
            .expect_take()
            .returning(|_, _| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let err = mocked(loans).take_book("alice@example.com", ISBN).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
