//! Разбор входной последовательности операций
//!
//! Преобразует строку вида `R1(X);R2(X);W1(X);C1;C2` в проверенный список
//! операций. Каждый токен разбирается явно, без арифметики позиций.

use crate::common::{Error, Result};
use crate::core::operation::{Operation, TableId, TransactionId};
use indexmap::IndexMap;

/// Разделитель операций
pub const SEPARATOR: char = ';';

/// Токенизатор последовательности
pub struct SequenceTokenizer<'a> {
    /// Токены без пробелов по краям
    tokens: std::str::Split<'a, char>,
    /// Номер следующего токена (с единицы, для сообщений об ошибках)
    position: usize,
}

impl<'a> SequenceTokenizer<'a> {
    /// Создает токенизатор; один завершающий `;` отбрасывается
    pub fn new(input: &'a str) -> Result<Self> {
        let trimmed = input.trim();
        let body = trimmed.strip_suffix(SEPARATOR).unwrap_or(trimmed);
        if body.trim().is_empty() {
            return Err(Error::invalid_sequence("sequence is empty"));
        }

        Ok(Self {
            tokens: body.split(SEPARATOR),
            position: 0,
        })
    }

    /// Разбирает один токен
    fn parse_token(&self, token: &str) -> Result<Operation> {
        let mut chars = token.chars();
        let head = chars.next().ok_or_else(|| {
            Error::invalid_sequence(format!("empty operation at position {}", self.position))
        })?;
        let rest = chars.as_str();

        match head {
            'R' | 'W' => {
                let (id, table) = rest.split_once('(').ok_or_else(|| {
                    Error::invalid_sequence(format!("missing table in operation '{}'", token))
                })?;
                let transaction = parse_transaction(id, token)?;
                let table = parse_table(table, token)?;
                Ok(if head == 'R' {
                    Operation::read(transaction, table)
                } else {
                    Operation::write(transaction, table)
                })
            }
            'C' => Ok(Operation::commit(parse_transaction(rest, token)?)),
            _ => Err(Error::invalid_sequence(format!(
                "invalid operation '{}' at position {}",
                token, self.position
            ))),
        }
    }
}

impl Iterator for SequenceTokenizer<'_> {
    type Item = Result<Operation>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.tokens.next()?.trim();
        self.position += 1;
        Some(self.parse_token(token))
    }
}

fn parse_transaction(digits: &str, token: &str) -> Result<TransactionId> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid_sequence(format!(
            "invalid transaction id in operation '{}'",
            token
        )));
    }
    let id: u32 = digits.parse().map_err(|_| {
        Error::invalid_sequence(format!("transaction id out of range in '{}'", token))
    })?;
    if id == 0 {
        return Err(Error::invalid_sequence(format!(
            "transaction id must be positive in '{}'",
            token
        )));
    }
    Ok(TransactionId::new(id))
}

fn parse_table(tail: &str, token: &str) -> Result<TableId> {
    let name = tail.strip_suffix(')').ok_or_else(|| {
        Error::invalid_sequence(format!("missing ')' in operation '{}'", token))
    })?;
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => TableId::new(c),
        _ => Err(Error::invalid_sequence(format!(
            "invalid table name '{}': expected a single letter",
            name
        ))),
    }
}

/// Разбирает и проверяет последовательность целиком
///
/// Гарантирует, что у каждой транзакции есть хотя бы одно чтение или запись,
/// ровно одна фиксация и ни одной операции после фиксации.
pub fn parse_sequence(input: &str) -> Result<Vec<Operation>> {
    let operations = SequenceTokenizer::new(input)?.collect::<Result<Vec<_>>>()?;
    validate(&operations)?;
    Ok(operations)
}

/// Проверяет инварианты последовательности
pub fn validate(operations: &[Operation]) -> Result<()> {
    if operations.is_empty() {
        return Err(Error::invalid_sequence("sequence is empty"));
    }

    // транзакция -> (есть чтение/запись, зафиксирована)
    let mut seen: IndexMap<TransactionId, (bool, bool)> = IndexMap::new();
    for operation in operations {
        let transaction = operation.transaction();
        let (has_access, committed) = seen.entry(transaction).or_insert((false, false));
        if *committed {
            return Err(Error::invalid_sequence(if operation.is_commit() {
                format!("duplicate commit for transaction {}", transaction.value())
            } else {
                format!(
                    "operation {} after commit of transaction {}",
                    operation,
                    transaction.value()
                )
            }));
        }
        if operation.is_commit() {
            if !*has_access {
                return Err(Error::invalid_sequence(format!(
                    "transaction {} has no read or write operation",
                    transaction.value()
                )));
            }
            *committed = true;
        } else {
            *has_access = true;
        }
    }

    if let Some((transaction, _)) = seen.iter().find(|(_, (_, committed))| !*committed) {
        return Err(Error::invalid_sequence(format!(
            "missing commit operation for transaction {}",
            transaction.value()
        )));
    }

    Ok(())
}
