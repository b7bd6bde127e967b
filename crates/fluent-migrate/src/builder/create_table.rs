use crate::columns::ColumnSink;
use crate::context::MigrationContext;
use crate::error::Result;
use crate::feature::{extend_unique, Feature};
use crate::migration::{MigrationStep, StepItem};
use crate::operation::Operation;
use crate::schema::{ColumnDefinition, CreateTableSpec, ForeignKeyDefinition, IndexDefinition};

/// Builder for `CREATE TABLE`.
///
/// `up` creates the table unless it already exists; `down` drops it only if
/// `up` created it.
///
/// ```rust,ignore
/// let posts = CreateTable::new("posts")
///     .big_int_column("id")
///     .varchar_column("title", 200)
///     .big_int_column("user_id")
///     .primary_key(["id"])
///     .auto_increment("id")
///     .index("idx_posts_user", ["user_id"]);
/// ```
#[derive(Debug, Clone)]
pub struct CreateTable {
    spec: CreateTableSpec,
    pending_auto_increment: Vec<String>,
}

impl CreateTable {
    /// Starts a table declaration.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            spec: CreateTableSpec::new(table),
            pending_auto_increment: Vec::new(),
        }
    }

    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Marks a column as auto-increment, now or once it is declared.
    #[must_use]
    pub fn auto_increment(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        match self.spec.columns.iter_mut().find(|c| c.name == column) {
            Some(existing) => existing.auto_increment = true,
            None => self.pending_auto_increment.push(column),
        }
        self
    }

    /// Adds a non-unique index.
    #[must_use]
    pub fn index<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.indexes.push(IndexDefinition::new(name, columns));
        self
    }

    /// Adds a unique index.
    #[must_use]
    pub fn unique_index<I, S>(mut self, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec
            .unique_indexes
            .push(IndexDefinition::unique(name, columns));
        self
    }

    /// Adds a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDefinition) -> Self {
        self.spec.foreign_keys.push(fk);
        self
    }

    /// Sets the storage engine.
    #[must_use]
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.spec.engine = Some(engine.into());
        self
    }

    /// Sets the default character set.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.spec.charset = Some(charset.into());
        self
    }

    /// Sets the default collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.spec.collation = Some(collation.into());
        self
    }

    /// The accumulated declaration.
    #[must_use]
    pub const fn spec(&self) -> &CreateTableSpec {
        &self.spec
    }

    fn required_features(&self) -> Vec<Feature> {
        let mut features = vec![Feature::CreateTable, Feature::DropTable];
        for column in &self.spec.columns {
            extend_unique(&mut features, column.required_features());
        }
        if self.spec.engine.is_some() {
            extend_unique(&mut features, [Feature::TableEngine]);
        }
        if self.spec.charset.is_some() {
            extend_unique(&mut features, [Feature::ColumnCharset]);
        }
        if self.spec.collation.is_some() {
            extend_unique(&mut features, [Feature::ColumnCollation]);
        }
        features
    }

    /// Compiles into a single guarded create operation, or a skip operation.
    #[must_use]
    pub fn compile(&self, ctx: &MigrationContext) -> Vec<Operation> {
        let table = &self.spec.table;

        let unsupported = ctx.features().unsupported(&self.required_features());
        if !unsupported.is_empty() {
            return vec![ctx.skip(ctx.unsupported_message("create table", table, &unsupported))];
        }

        if !self.spec.indexes.is_empty() && !ctx.renderer().supports_inline_indexes() {
            return vec![ctx.skip(format!(
                "Skip UP create table on {table}: non-unique indexes are not supported in \
                 CREATE TABLE for {}. Use AlterTableAdd::index instead.",
                ctx.features().describe_engine()
            ))];
        }

        vec![Operation::create_table(self.spec.clone())]
    }
}

impl ColumnSink for CreateTable {
    fn column(mut self, mut column: ColumnDefinition) -> Self {
        if let Some(pos) = self
            .pending_auto_increment
            .iter()
            .position(|name| *name == column.name)
        {
            column.auto_increment = true;
            self.pending_auto_increment.remove(pos);
        }
        self.spec.columns.push(column);
        self
    }
}

impl MigrationStep for CreateTable {
    fn expand(&self, ctx: &MigrationContext) -> Result<Vec<StepItem>> {
        Ok(self.compile(ctx).into_iter().map(StepItem::from).collect())
    }
}
