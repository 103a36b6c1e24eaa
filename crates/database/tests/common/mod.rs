//! Shared fixtures: a layers table grouped by path and an items table
//! pointing at layers.

#![allow(dead_code)]

use liveq_core::schema::{Table, TableBuilder};
use liveq_core::{DataType, Result, Row, Value};
use liveq_database::{Database, DatabaseConfig, LiveQueryError, QueryContext, Subscription};
use std::cell::RefCell;
use std::rc::Rc;

pub const GROUP_A: &str = "level_A/";
pub const GROUP_B: &str = "level_B/";

pub fn layers_schema() -> Table {
    TableBuilder::new("layers")
        .unwrap()
        .add_column("id", DataType::String)
        .unwrap()
        .add_column("name", DataType::String)
        .unwrap()
        .add_column("groupPath", DataType::String)
        .unwrap()
        .add_primary_key("id")
        .unwrap()
        .add_index("name", false)
        .unwrap()
        .add_index("groupPath", false)
        .unwrap()
        .build()
        .unwrap()
}

pub fn items_schema() -> Table {
    TableBuilder::new("items")
        .unwrap()
        .add_column("id", DataType::String)
        .unwrap()
        .add_column("name", DataType::String)
        .unwrap()
        .add_column("layerId", DataType::String)
        .unwrap()
        .add_primary_key("id")
        .unwrap()
        .add_index("name", false)
        .unwrap()
        .add_index("layerId", false)
        .unwrap()
        .build()
        .unwrap()
}

pub fn layer(id: &str, group_path: &str) -> Row {
    Row::new(vec![
        Value::from(id),
        Value::from(format!("name of {}", id)),
        Value::from(group_path),
    ])
}

pub fn item(id: &str, layer_id: &str) -> Row {
    Row::new(vec![
        Value::from(id),
        Value::from(format!("name of {}", id)),
        Value::from(layer_id),
    ])
}

/// An item of group A, pointing at its first layer.
pub fn item_a(id: &str) -> Row {
    item(id, "layer_A000")
}

/// An item of group B, pointing at its first layer.
pub fn item_b(id: &str) -> Row {
    item(id, "layer_B000")
}

/// Creates both tables with two layers and two items per group.
pub fn populated(config: DatabaseConfig) -> Database {
    let db = Database::new("fixtures", config);
    db.create_table(layers_schema()).unwrap();
    db.create_table(items_schema()).unwrap();

    for (group, path) in [("A", GROUP_A), ("B", GROUP_B)] {
        let layers: Vec<Row> = (0..2)
            .map(|i| layer(&format!("layer_{}{}{}{}", group, i, i, i), path))
            .collect();
        db.table("layers").unwrap().bulk_put(layers).unwrap();

        let items: Vec<Row> = (0..2)
            .map(|i| {
                item(
                    &format!("item_{}{}{}{}", group, i, i, i),
                    &format!("layer_{}000", group),
                )
            })
            .collect();
        db.table("items").unwrap().bulk_put(items).unwrap();
    }
    db
}

/// Items of every layer whose group path starts with `group_path`.
pub fn items_by_group_path(ctx: &QueryContext<'_>, group_path: &str) -> Result<Vec<Rc<Row>>> {
    let layer_ids = ctx
        .table("layers")?
        .where_("groupPath")?
        .starts_with(group_path)
        .primary_keys()?;
    ctx.table("items")?.where_("layerId")?.any_of(layer_ids).to_vec()
}

/// Collects emissions and errors of one subscription.
pub struct Recorder<T> {
    pub values: Rc<RefCell<Vec<T>>>,
    pub errors: Rc<RefCell<Vec<LiveQueryError>>>,
}

impl<T: 'static> Recorder<T> {
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(Vec::new())),
            errors: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn on_next(&self) -> impl Fn(T) + 'static {
        let values = self.values.clone();
        move |v| values.borrow_mut().push(v)
    }

    pub fn on_error(&self) -> impl Fn(LiveQueryError) + 'static {
        let errors = self.errors.clone();
        move |e| errors.borrow_mut().push(e)
    }

    pub fn emissions(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.borrow().len()
    }
}

impl<T: Clone + 'static> Recorder<T> {
    pub fn last(&self) -> Option<T> {
        self.values.borrow().last().cloned()
    }
}

/// Subscribes to the items of `group_path`, recording item counts.
pub fn watch_group(db: &Database, group_path: &'static str) -> (Subscription, Recorder<usize>) {
    let recorder = Recorder::new();
    let sub = db.live_query(
        move |ctx: &QueryContext<'_>| Ok(items_by_group_path(ctx, group_path)?.len()),
        recorder.on_next(),
        recorder.on_error(),
    );
    (sub, recorder)
}

/// Same as `watch_group`, split into a layer stage and an item stage.
pub fn watch_group_chained(
    db: &Database,
    group_path: &'static str,
) -> (Subscription, Recorder<usize>) {
    let recorder = Recorder::new();
    let sub = db.live_query_chain(
        move |ctx: &QueryContext<'_>| {
            ctx.table("layers")?
                .where_("groupPath")?
                .starts_with(group_path)
                .primary_keys()
        },
        |ctx: &QueryContext<'_>, layer_ids: &Vec<Value>| {
            ctx.table("items")?
                .where_("layerId")?
                .any_of(layer_ids.iter().cloned())
                .count()
        },
        recorder.on_next(),
        recorder.on_error(),
    );
    (sub, recorder)
}
