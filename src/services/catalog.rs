//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult, LendingError},
    models::{Book, CreateBook},
    repository::{books::DUPLICATE_ISBN, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Check that the catalog store answers
    pub async fn ping_storage(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, isbn: &str) -> AppResult<Book> {
        self.repository.books.get_by_isbn(isbn).await
    }

    /// Add a book to the catalog. ISBNs are unique.
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;

        if self.repository.books.isbn_exists(&book.isbn).await? {
            return Err(AppError::Conflict(DUPLICATE_ISBN.to_string()));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!(isbn = %created.isbn, units = created.available_units, "Book added to catalog");
        Ok(created)
    }

    /// Whether any user currently holds a copy
    pub async fn is_book_taken(&self, isbn: &str) -> AppResult<bool> {
        self.repository.books.is_taken(isbn).await
    }

    /// Delete a book nobody holds
    pub async fn delete_book(&self, isbn: &str) -> AppResult<()> {
        // Surface 404 before the lending check
        self.repository.books.get_by_isbn(isbn).await?;

        if self.is_book_taken(isbn).await? {
            return Err(LendingError::BookAlreadyTaken.into());
        }

        self.repository.books.delete(isbn).await?;
        tracing::info!(isbn, "Book removed from catalog");
        Ok(())
    }
}
