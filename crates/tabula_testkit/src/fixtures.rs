//! Test fixtures and workspace helpers.
//!
//! Provides convenience functions for setting up test workspaces
//! and common linked-table scenarios.

use std::path::Path;
use tabula_core::Workspace;
use tempfile::TempDir;

/// A test workspace with automatic cleanup.
pub struct TestWorkspace {
    /// The workspace instance.
    pub ws: Workspace,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestWorkspace {
    /// Creates a new in-memory test workspace.
    pub fn memory() -> Self {
        Self {
            ws: Workspace::open_in_memory().expect("Failed to open in-memory workspace"),
            temp_dir: None,
        }
    }

    /// Creates a new workspace in a fresh temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let ws = Workspace::open(temp_dir.path()).expect("Failed to open file workspace");
        Self {
            ws,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the workspace directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Closes the workspace and opens the same directory again.
    ///
    /// # Panics
    ///
    /// Panics for in-memory workspaces or if reopening fails.
    pub fn reopen(self) -> Self {
        let Self { ws, temp_dir } = self;
        drop(ws);
        let temp_dir = temp_dir.expect("Only file workspaces can be reopened");
        let ws = Workspace::open(temp_dir.path()).expect("Failed to reopen workspace");
        Self {
            ws,
            temp_dir: Some(temp_dir),
        }
    }
}

impl std::ops::Deref for TestWorkspace {
    type Target = Workspace;

    fn deref(&self) -> &Self::Target {
        &self.ws
    }
}

/// Runs a test with a temporary in-memory workspace.
///
/// # Example
///
/// ```rust,ignore
/// use tabula_testkit::with_temp_workspace;
///
/// #[test]
/// fn my_test() {
///     with_temp_workspace(|ws| {
///         assert!(ws.list_tables().unwrap().is_empty());
///     });
/// }
/// ```
pub fn with_temp_workspace<F, R>(f: F) -> R
where
    F: FnOnce(&Workspace) -> R,
{
    let test_ws = TestWorkspace::memory();
    f(&test_ws.ws)
}

/// Runs a test with a workspace in a temporary directory.
pub fn with_file_workspace<F, R>(f: F) -> R
where
    F: FnOnce(&Workspace, &Path) -> R,
{
    let test_ws = TestWorkspace::file();
    let path = test_ws
        .path()
        .expect("File workspace should have a path")
        .to_path_buf();
    f(&test_ws.ws, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use serde_json::{json, Value};
    use tabula_core::{
        Column, ColumnKind, Fields, Relation, RelationCardinality, RowId, TableDraft, TableId,
        Workspace,
    };

    /// Ids of the tables built by [`linked_tables`].
    #[derive(Debug, Clone)]
    pub struct LinkedTables {
        /// Dictionary table: `name` (text), `hex` (text), `tier` (select).
        pub colors: TableId,
        /// Referencing table: `title` (text), `color` (dictRef to
        /// `colors.name`), `swatch` (relation to `colors`, keyed on `name`,
        /// displaying `hex`).
        pub products: TableId,
    }

    /// Builds a fields map from a JSON object literal.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not an object.
    pub fn fields(value: Value) -> Fields {
        value
            .as_object()
            .cloned()
            .expect("fields must be a JSON object")
    }

    /// Creates a dictionary table and a table pointing into it, with rows.
    pub fn linked_tables(ws: &Workspace) -> LinkedTables {
        let colors = ws
            .create_table(
                TableDraft::new(
                    "Colors",
                    vec![
                        Column::text("name", "Name"),
                        Column::text("hex", "Hex"),
                        Column::select("tier", "Tier", ["basic", "premium"]),
                    ],
                )
                .with_id("colors"),
            )
            .expect("Failed to create colors table");

        let products = ws
            .create_table(
                TableDraft::new(
                    "Products",
                    vec![
                        Column::text("title", "Title"),
                        Column::text("color", "Color").with_dict_ref("colors", "name"),
                        Column::new("swatch", "Swatch", ColumnKind::Relation).with_relation(
                            Relation {
                                target_table_id: "colors".into(),
                                target_column_id: "name".into(),
                                display_column_id: Some("hex".into()),
                                cardinality: RelationCardinality::Single,
                            },
                        ),
                    ],
                )
                .with_id("products"),
            )
            .expect("Failed to create products table");

        for (id, name, hex, tier) in [
            ("c1", "red", "#f00", "basic"),
            ("c2", "green", "#0f0", "basic"),
            ("c3", "gold", "#fd0", "premium"),
        ] {
            ws.create_row(
                &colors.id,
                fields(json!({"id": id, "name": name, "hex": hex, "tier": tier})),
            )
            .expect("Failed to create color row");
        }
        for (id, title, color) in [("p1", "Mug", "red"), ("p2", "Lamp", "gold")] {
            ws.create_row(
                &products.id,
                fields(json!({"id": id, "title": title, "color": color, "swatch": color})),
            )
            .expect("Failed to create product row");
        }

        LinkedTables {
            colors: colors.id,
            products: products.id,
        }
    }

    /// Creates a table with one text column `a` and `count` rows `r0..`.
    pub fn single_table(ws: &Workspace, count: usize) -> (TableId, Vec<RowId>) {
        let table = ws
            .create_table(TableDraft::new("Items", vec![Column::text("a", "A")]).with_id("items"))
            .expect("Failed to create items table");
        let ids = (0..count)
            .map(|i| {
                ws.create_row(&table.id, fields(json!({"id": format!("r{i}"), "a": i})))
                    .expect("Failed to create row")
                    .id
            })
            .collect();
        (table.id, ids)
    }
}
