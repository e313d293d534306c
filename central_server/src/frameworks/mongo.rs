// Mongo-backed implementations of the coordinator's store ports.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime};
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{ChunkRecord, LeaderboardEntry, PlayerStatus, PlayerUpdate};
use crate::domain::ports::{ChunkStore, MapStore, StorePing, UserStore};

const DATABASE: &str = "game";

#[derive(Clone)]
pub struct MongoStore {
    client: Client,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkDoc {
    x: i32,
    y: i32,
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDoc {
    user_name: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    high_score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct MapDoc {
    map: Vec<Vec<String>>,
}

impl MongoStore {
    pub async fn connect(uri: &str) -> Result<Self, String> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|err| format!("mongo connect failed: {err}"))?;
        Ok(Self { client })
    }

    fn chunks(&self) -> Collection<ChunkDoc> {
        self.client.database(DATABASE).collection("chunks")
    }

    fn users(&self) -> Collection<UserDoc> {
        self.client.database(DATABASE).collection("users")
    }

    fn maps(&self) -> Collection<MapDoc> {
        self.client.database(DATABASE).collection("maps")
    }
}

#[async_trait]
impl StorePing for MongoStore {
    async fn ping(&self) -> Result<(), String> {
        self.client
            .database("admin")
            .run_command(doc! {"ping": 1})
            .await
            .map(|_| ())
            .map_err(|err| format!("mongo ping failed: {err}"))
    }
}

#[async_trait]
impl ChunkStore for MongoStore {
    async fn find(&self, x: i32, y: i32) -> Result<Option<ChunkRecord>, String> {
        self.chunks()
            .find_one(doc! {"x": x, "y": y})
            .await
            .map(|found| {
                found.map(|chunk| ChunkRecord {
                    x: chunk.x,
                    y: chunk.y,
                    url: chunk.url,
                })
            })
            .map_err(|err| format!("chunk lookup failed: {err}"))
    }

    async fn insert(&self, record: ChunkRecord) -> Result<(), String> {
        self.chunks()
            .insert_one(ChunkDoc {
                x: record.x,
                y: record.y,
                url: record.url,
            })
            .await
            .map(|_| ())
            .map_err(|err| format!("chunk insert failed: {err}"))
    }

    async fn delete(&self, x: i32, y: i32) -> Result<bool, String> {
        self.chunks()
            .delete_one(doc! {"x": x, "y": y})
            .await
            .map(|result| result.deleted_count > 0)
            .map_err(|err| format!("chunk delete failed: {err}"))
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn apply_update(&self, update: &PlayerUpdate) -> Result<(), String> {
        self.users()
            .update_one(
                doc! {"userName": &update.user_name},
                doc! {
                    "$set": {
                        "score": update.score,
                        "status": update.status.as_str(),
                        "updatedAt": DateTime::now(),
                    },
                    "$max": {"highScore": update.score},
                },
            )
            .upsert(true)
            .await
            .map(|_| ())
            .map_err(|err| format!("user upsert failed: {err}"))
    }

    async fn top_by_high_score(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, String> {
        let cursor = self
            .users()
            .find(doc! {})
            .sort(doc! {"highScore": -1})
            .limit(limit)
            .await
            .map_err(|err| format!("leaderboard query failed: {err}"))?;
        let users: Vec<UserDoc> = cursor
            .try_collect()
            .await
            .map_err(|err| format!("leaderboard cursor failed: {err}"))?;
        Ok(users
            .into_iter()
            .map(|user| LeaderboardEntry {
                user_name: user.user_name,
                score: user.high_score,
            })
            .collect())
    }

    async fn find_by_status(&self, status: PlayerStatus) -> Result<Vec<LeaderboardEntry>, String> {
        let cursor = self
            .users()
            .find(doc! {"status": status.as_str()})
            .await
            .map_err(|err| format!("status query failed: {err}"))?;
        let users: Vec<UserDoc> = cursor
            .try_collect()
            .await
            .map_err(|err| format!("status cursor failed: {err}"))?;
        Ok(users
            .into_iter()
            .map(|user| LeaderboardEntry {
                user_name: user.user_name,
                score: user.score,
            })
            .collect())
    }
}

#[async_trait]
impl MapStore for MongoStore {
    async fn find(&self, coordinate: &str) -> Result<Option<Vec<Vec<String>>>, String> {
        self.maps()
            .find_one(doc! {"coordinate": coordinate})
            .await
            .map(|found| found.map(|doc| doc.map))
            .map_err(|err| format!("map lookup failed: {err}"))
    }
}
