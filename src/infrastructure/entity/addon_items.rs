use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "addon_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub currency: String,
    pub for_attendees: bool,
    pub for_exhibitors: bool,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::addon_purchases::Entity")]
    AddonPurchases,
}

impl Related<super::addon_purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AddonPurchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
