//! Query preparation: table extraction and payload construction.
//!
//! Parses a SQL statement with sqlparser to collect every referenced table,
//! combines the result with the resolved caller role, and produces the
//! submission payload. The SQL text itself is passed through verbatim.

use serde::Serialize;
use sqlparser::ast::{
    Expr, FromTable, JoinConstraint, JoinOperator, Query, Select, SelectItem, SetExpr, Statement,
    TableFactor, TableWithJoins,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::sync::Arc;

use crate::error::MetadataError;
use crate::identity::{resolve_role, IdentityProvider};

/// Outbound request body for a query submission.
///
/// `tables` holds distinct names in first-seen order and is never empty; an
/// empty extraction result is a failure, not a valid payload.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub query: String,
    pub role: String,
    pub tables: Vec<String>,
}

/// Builds submission payloads from raw SQL statements.
pub struct QueryPreparer {
    provider: Arc<dyn IdentityProvider>,
}

impl QueryPreparer {
    /// Creates a preparer using the given identity provider.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    /// Prepares a SQL statement for submission.
    ///
    /// Resolves the caller's role, extracts the referenced tables, and builds
    /// the payload. Identity failures propagate as `MetadataError::Identity`.
    pub async fn prepare(&self, query: &str) -> Result<SubmissionPayload, MetadataError> {
        let role = resolve_role(self.provider.as_ref()).await?;
        let tables = extract_tables(query)?;

        Ok(SubmissionPayload {
            query: query.to_string(),
            role,
            tables,
        })
    }
}

/// Extracts the distinct table names referenced by a SQL statement.
///
/// Covers FROM clauses, joins (including ON constraints), derived tables,
/// nested joins, CTEs, set operations, INSERT/UPDATE/DELETE targets, and
/// subqueries in select lists, WHERE, and HAVING. Names are returned in
/// first-seen order. CTE aliases are not real tables and are excluded.
pub fn extract_tables(sql: &str) -> Result<Vec<String>, MetadataError> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql)
        .map_err(|e| MetadataError::ParseFailure(e.to_string()))?;

    let mut collector = TableCollector::default();
    for statement in &statements {
        collect_statement(statement, &mut collector);
    }

    let tables = collector.into_tables();
    if tables.is_empty() {
        return Err(MetadataError::NoTablesFound);
    }

    Ok(tables)
}

/// Accumulates referenced table names in first-seen order.
#[derive(Debug, Default)]
struct TableCollector {
    tables: Vec<String>,
    cte_aliases: Vec<String>,
}

impl TableCollector {
    fn push_table(&mut self, name: String) {
        if !self.tables.contains(&name) {
            self.tables.push(name);
        }
    }

    fn push_cte_alias(&mut self, name: String) {
        if !self.cte_aliases.contains(&name) {
            self.cte_aliases.push(name);
        }
    }

    fn into_tables(self) -> Vec<String> {
        let aliases = self.cte_aliases;
        self.tables
            .into_iter()
            .filter(|t| !aliases.contains(t))
            .collect()
    }
}

fn collect_statement(statement: &Statement, collector: &mut TableCollector) {
    match statement {
        Statement::Query(query) => collect_query(query, collector),
        Statement::Insert(insert) => {
            collector.push_table(insert.table_name.to_string());
            if let Some(source) = &insert.source {
                collect_query(source, collector);
            }
        }
        Statement::Update {
            table,
            from,
            selection,
            ..
        } => {
            collect_table_with_joins(table, collector);
            if let Some(from) = from {
                collect_table_with_joins(from, collector);
            }
            if let Some(selection) = selection {
                collect_expr(selection, collector);
            }
        }
        Statement::Delete(delete) => {
            let relations = match &delete.from {
                FromTable::WithFromKeyword(relations) => relations,
                FromTable::WithoutKeyword(relations) => relations,
            };
            for twj in relations {
                collect_table_with_joins(twj, collector);
            }
            if let Some(using) = &delete.using {
                for twj in using {
                    collect_table_with_joins(twj, collector);
                }
            }
            if let Some(selection) = &delete.selection {
                collect_expr(selection, collector);
            }
        }
        // Other statement kinds reference no queryable tables for our purposes
        _ => {}
    }
}

fn collect_query(query: &Query, collector: &mut TableCollector) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collector.push_cte_alias(cte.alias.name.value.clone());
            collect_query(&cte.query, collector);
        }
    }

    collect_set_expr(&query.body, collector);
}

fn collect_set_expr(set_expr: &SetExpr, collector: &mut TableCollector) {
    match set_expr {
        SetExpr::Select(select) => collect_select(select, collector),
        SetExpr::Query(query) => collect_query(query, collector),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, collector);
            collect_set_expr(right, collector);
        }
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => {
            collect_statement(stmt, collector);
        }
        // Values, Table - no named relations to record
        _ => {}
    }
}

fn collect_select(select: &Select, collector: &mut TableCollector) {
    for table_with_joins in &select.from {
        collect_table_with_joins(table_with_joins, collector);
    }

    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                collect_expr(expr, collector);
            }
            _ => {}
        }
    }

    if let Some(selection) = &select.selection {
        collect_expr(selection, collector);
    }

    if let Some(having) = &select.having {
        collect_expr(having, collector);
    }
}

fn collect_table_with_joins(twj: &TableWithJoins, collector: &mut TableCollector) {
    collect_table_factor(&twj.relation, collector);
    for join in &twj.joins {
        collect_table_factor(&join.relation, collector);
        collect_join_operator(&join.join_operator, collector);
    }
}

/// Walks ON constraints for subquery references.
fn collect_join_operator(op: &JoinOperator, collector: &mut TableCollector) {
    match op {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::LeftSemi(constraint)
        | JoinOperator::RightSemi(constraint)
        | JoinOperator::LeftAnti(constraint)
        | JoinOperator::RightAnti(constraint) => {
            if let JoinConstraint::On(expr) = constraint {
                collect_expr(expr, collector);
            }
        }
        _ => {}
    }
}

fn collect_table_factor(factor: &TableFactor, collector: &mut TableCollector) {
    match factor {
        TableFactor::Table { name, .. } => collector.push_table(name.to_string()),
        TableFactor::Derived { subquery, .. } => collect_query(subquery, collector),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => collect_table_with_joins(table_with_joins, collector),
        // Table functions and UNNEST carry no plain table name
        _ => {}
    }
}

/// Walks WHERE-clause expressions for subquery references.
fn collect_expr(expr: &Expr, collector: &mut TableCollector) {
    match expr {
        Expr::Subquery(query) => collect_query(query, collector),
        Expr::InSubquery { subquery, .. } => collect_query(subquery, collector),
        Expr::Exists { subquery, .. } => collect_query(subquery, collector),
        Expr::BinaryOp { left, right, .. } => {
            collect_expr(left, collector);
            collect_expr(right, collector);
        }
        Expr::UnaryOp { expr, .. } | Expr::Nested(expr) => collect_expr(expr, collector),
        _ => {}
    }
}
