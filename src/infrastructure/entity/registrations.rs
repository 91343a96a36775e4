use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "registrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reference_number: String,
    pub confirmation_code: String,
    pub kind: String,
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
    pub ticket_type: Option<String>,
    pub package_type: Option<String>,
    pub company_name: Option<String>,
    pub total_due: Decimal,
    pub currency: String,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
    #[sea_orm(has_many = "super::addon_purchases::Entity")]
    AddonPurchases,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::addon_purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AddonPurchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
