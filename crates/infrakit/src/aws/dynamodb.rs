//! AWS DynamoDB tables.
use anyhow::Context;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::{error::BuildError, types as aws};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum KeyType {
    Hash,
    Range,
}

impl From<KeyType> for aws::KeyType {
    fn from(value: KeyType) -> Self {
        match value {
            KeyType::Hash => aws::KeyType::Hash,
            KeyType::Range => aws::KeyType::Range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AttributeType {
    Binary,
    Number,
    String,
}

impl From<AttributeType> for aws::ScalarAttributeType {
    fn from(value: AttributeType) -> Self {
        match value {
            AttributeType::Binary => aws::ScalarAttributeType::B,
            AttributeType::Number => aws::ScalarAttributeType::N,
            AttributeType::String => aws::ScalarAttributeType::S,
        }
    }
}

/// One key of a table, together with the type of the keyed attribute.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeySchemaElement {
    pub attribute_name: String,
    pub key_type: KeyType,
    pub attribute_type: AttributeType,
}

impl TryFrom<&KeySchemaElement> for aws::KeySchemaElement {
    type Error = BuildError;

    fn try_from(value: &KeySchemaElement) -> Result<Self, Self::Error> {
        aws::KeySchemaElement::builder()
            .attribute_name(value.attribute_name.clone())
            .key_type(value.key_type.into())
            .build()
    }
}

impl TryFrom<&KeySchemaElement> for aws::AttributeDefinition {
    type Error = BuildError;

    fn try_from(value: &KeySchemaElement) -> Result<Self, Self::Error> {
        aws::AttributeDefinition::builder()
            .attribute_name(value.attribute_name.clone())
            .attribute_type(value.attribute_type.into())
            .build()
    }
}

impl KeySchemaElement {
    pub fn partition_key(name: impl Into<String>, type_is: AttributeType) -> Self {
        KeySchemaElement {
            attribute_name: name.into(),
            key_type: KeyType::Hash,
            attribute_type: type_is,
        }
    }

    pub fn sort_key(name: impl Into<String>, type_is: AttributeType) -> Self {
        KeySchemaElement {
            attribute_name: name.into(),
            key_type: KeyType::Range,
            attribute_type: type_is,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TableClass {
    #[default]
    Standard,
    StandardInfrequentAccess,
}

impl From<TableClass> for aws::TableClass {
    fn from(value: TableClass) -> Self {
        match value {
            TableClass::Standard => aws::TableClass::Standard,
            TableClass::StandardInfrequentAccess => aws::TableClass::StandardInfrequentAccess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum BillingMode {
    PayPerRequest,
    Provisioned {
        read_capacity_units: i64,
        write_capacity_units: i64,
    },
}

impl Default for BillingMode {
    fn default() -> Self {
        BillingMode::Provisioned {
            read_capacity_units: 5,
            write_capacity_units: 5,
        }
    }
}

impl From<BillingMode> for aws::BillingMode {
    fn from(value: BillingMode) -> Self {
        match value {
            BillingMode::PayPerRequest => aws::BillingMode::PayPerRequest,
            BillingMode::Provisioned { .. } => aws::BillingMode::Provisioned,
        }
    }
}

impl BillingMode {
    fn provisioned_throughput(&self) -> Result<Option<aws::ProvisionedThroughput>, BuildError> {
        match *self {
            BillingMode::PayPerRequest => Ok(None),
            BillingMode::Provisioned {
                read_capacity_units,
                write_capacity_units,
            } => aws::ProvisionedThroughput::builder()
                .read_capacity_units(read_capacity_units)
                .write_capacity_units(write_capacity_units)
                .build()
                .map(Some),
        }
    }
}

/// Everything needed to create a table.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Table {
    pub table_name: String,
    pub table_class: TableClass,
    pub key_schema: Vec<KeySchemaElement>,
    pub billing_mode: BillingMode,
}

impl Table {
    fn key_schema(&self) -> Result<Vec<aws::KeySchemaElement>, BuildError> {
        self.key_schema.iter().map(TryFrom::try_from).collect()
    }

    fn attribute_definitions(&self) -> Result<Vec<aws::AttributeDefinition>, BuildError> {
        self.key_schema.iter().map(TryFrom::try_from).collect()
    }
}

/// Starts creation of the table, returning its ARN.
///
/// The table is not usable until AWS has finished creating it, see
/// [`finalize`].
pub async fn create_table(table: &Table, cfg: &SdkConfig) -> anyhow::Result<String> {
    anyhow::ensure!(
        !table.key_schema.is_empty(),
        "table {} needs at least a partition key",
        table.table_name
    );
    let client = aws_sdk_dynamodb::Client::new(cfg);
    let out = client
        .create_table()
        .table_name(&table.table_name)
        .table_class(table.table_class.into())
        .billing_mode(table.billing_mode.into())
        .set_provisioned_throughput(table.billing_mode.provisioned_throughput()?)
        .set_key_schema(Some(table.key_schema()?))
        .set_attribute_definitions(Some(table.attribute_definitions()?))
        .send()
        .await?;
    let description = out.table_description.context("missing table description")?;
    let arn = description.table_arn.context("table missing arn")?;
    log::info!(
        "table {} {arn} creation started, you must wait for AWS to finalize \
         before adding items",
        table.table_name
    );
    Ok(arn)
}

/// Waits for the named table to become active.
pub async fn finalize(table_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    // timeout after 5 minutes
    let timeout_secs = 60 * 5;
    let start = std::time::Instant::now();
    log::info!("awaiting table finalization");
    let client = aws_sdk_dynamodb::Client::new(cfg);
    loop {
        let out = client.describe_table().table_name(table_name).send().await?;
        let table_info = out.table.context("missing table description")?;
        if table_info.table_status == Some(aws::TableStatus::Active) {
            log::info!("...table {table_name} is active");
            return Ok(());
        }
        anyhow::ensure!(
            table_info.table_status == Some(aws::TableStatus::Creating),
            "table finalization failed, table status: {:?}",
            table_info.table_status
        );
        if start.elapsed().as_secs() >= timeout_secs {
            anyhow::bail!("finalization timed out after {timeout_secs} seconds");
        }
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
    }
}

/// Returns the table name of a table ARN, or the input if it is not an ARN.
pub fn table_name(arn_or_name: &str) -> &str {
    if super::is_arn(arn_or_name) {
        arn_or_name
            .rsplit_once('/')
            .map_or(arn_or_name, |(_, name)| name)
    } else {
        arn_or_name
    }
}

pub async fn delete_table(arn_or_name: &str, cfg: &SdkConfig) -> anyhow::Result<()> {
    let name = table_name(arn_or_name);
    let client = aws_sdk_dynamodb::Client::new(cfg);
    let _ = client.delete_table().table_name(name).send().await?;
    log::info!("deleted dynamodb table {name}");
    Ok(())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn table_name_from_arn() {
        assert_eq!(
            "locks",
            table_name("arn:aws:dynamodb:us-east-2:123456789012:table/locks")
        );
        assert_eq!("locks", table_name("locks"));
    }

    #[test]
    fn key_schema_converts() {
        let table = Table {
            table_name: "locks".into(),
            key_schema: vec![
                KeySchemaElement::partition_key("LockID", AttributeType::String),
                KeySchemaElement::sort_key("Created", AttributeType::Number),
            ],
            ..Default::default()
        };
        let keys = table.key_schema().unwrap();
        assert_eq!("LockID", keys[0].attribute_name());
        assert_eq!(&aws::KeyType::Hash, keys[0].key_type());
        assert_eq!(&aws::KeyType::Range, keys[1].key_type());

        let attrs = table.attribute_definitions().unwrap();
        assert_eq!(&aws::ScalarAttributeType::S, attrs[0].attribute_type());
        assert_eq!(&aws::ScalarAttributeType::N, attrs[1].attribute_type());
    }

    #[test]
    fn billing_mode_throughput() {
        assert!(BillingMode::PayPerRequest
            .provisioned_throughput()
            .unwrap()
            .is_none());
        let throughput = BillingMode::default().provisioned_throughput().unwrap().unwrap();
        assert_eq!(5, throughput.read_capacity_units());
        assert_eq!(5, throughput.write_capacity_units());
    }
}
