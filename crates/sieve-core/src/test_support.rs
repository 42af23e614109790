use crate::model::{ModelCache, SchemaDef};
use std::sync::Arc;

pub(crate) const FIXTURE_SCHEMA: &str = r#"
[entities.Customer]
properties = { id = "int", name = "text", email = "text", age = "int", status = { enum = ["active", "pending", "suspended"] } }
relations = { orders = { target = "Order", cardinality = "many" } }

[entities.Order]
properties = { id = "int", name = "text", total = "float", placed = "timestamp", reference = "ulid", archived = "bool", status = { enum = ["open", "shipped", "closed"] } }
relations = { items = { target = "Item", cardinality = "many" }, customer = { target = "Customer" } }
aliases = { sku = "items.sku", buyer = "customer.name", loop_a = "loop_b", loop_b = "loop_a" }

[entities.Item]
properties = { id = "int", sku = "text", quantity = "int", price = "float" }
relations = { order = { target = "Order" }, parts = { target = "Part", cardinality = "many" } }

[entities.Part]
properties = { id = "int", code = "text" }

[entities.Animal]
abstract = true
subclasses = ["Dog", "Cat"]
properties = { id = "int", name = "text", legs = "int" }

[entities.Dog]
discriminator = "dog"
subclasses = ["Puppy"]
properties = { id = "int", name = "text", legs = "int", breed = "text" }

[entities.Puppy]
discriminator = "puppy"
properties = { id = "int", name = "text", legs = "int", breed = "text", weeks = "int" }

[entities.Cat]
discriminator = "cat"
properties = { id = "int", name = "text", legs = "int", indoor = "bool" }
"#;

pub(crate) fn schema() -> SchemaDef {
    SchemaDef::from_toml_str(FIXTURE_SCHEMA).expect("fixture schema should parse")
}

pub(crate) fn models() -> Arc<ModelCache> {
    Arc::new(ModelCache::new(schema()))
}
