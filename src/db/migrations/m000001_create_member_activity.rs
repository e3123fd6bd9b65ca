use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MemberActivity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MemberActivity::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MemberActivity::GuildId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MemberActivity::MemberId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MemberActivity::MemberName).string().not_null())
                    .col(
                        ColumnDef::new(MemberActivity::LastActive)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MemberActivity::Description)
                            .string_len(80)
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key, also the conflict target for upserts
        manager
            .create_index(
                Index::create()
                    .name("idx-member-activity-guild-member")
                    .table(MemberActivity::Table)
                    .col(MemberActivity::GuildId)
                    .col(MemberActivity::MemberId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-member-activity-guild")
                    .table(MemberActivity::Table)
                    .col(MemberActivity::GuildId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MemberActivity::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum MemberActivity {
    Table,
    Id,
    GuildId,
    MemberId,
    MemberName,
    LastActive,
    Description,
}
