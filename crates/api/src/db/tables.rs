//! Compile-time–checked column identifiers for all tables.

use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum Families {
    Table,
    Id,
    Name,
    Currency,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Users {
    Table,
    Id,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    Role,
    FamilyId,
    IsActive,
    LastLogin,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Invites {
    Table,
    Id,
    FamilyId,
    CreatedBy,
    Email,
    Role,
    Token,
    Status,
    ExpiresAt,
    AcceptedAt,
    AcceptedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Categories {
    Table,
    Id,
    FamilyId,
    Name,
    CategoryType,
    Color,
    Icon,
    ParentId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Transactions {
    Table,
    Id,
    FamilyId,
    UserId,
    CategoryId,
    AmountCents,
    TransactionType,
    Description,
    Date,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Budgets {
    Table,
    Id,
    FamilyId,
    CategoryId,
    Name,
    AmountCents,
    Period,
    StartDate,
    EndDate,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Reports {
    Table,
    Id,
    FamilyId,
    UserId,
    Name,
    ReportType,
    Period,
    StartDate,
    EndDate,
    Data,
    GeneratedAt,
}
