/// プレゼンテーション層モジュール
///
/// コマンド結果とUI表示の橋渡しを行います。
/// プレゼンテーション層はドメイン層に依存しますが、その逆はありません。
///
/// # モジュール
/// - `input`: 確認プロンプト
/// - `output`: コマンド結果・エラーの出力（人間向け・機械向け）
/// - `progress`: アップロード進捗のDTO変換と出力
pub mod input;
pub mod output;
pub mod progress;
